//! C code emission for frozen models
//!
//! Serializes a [`FisModel`] into a self-contained C99 translation unit
//! exposing one pure evaluation function:
//!
//! ```c
//! int <name>_eval(const double *in, double *out);
//! ```
//!
//! `in` carries the crisp inputs in declaration order, `out` receives
//! the crisp outputs in declaration order; the return value is 0. The
//! emitted routine mirrors the in-engine evaluator step for step
//! (input clamping, cached fuzzification as locals, the same operator
//! and defuzzifier arithmetic, midpoint fallback), so results agree
//! with [`FisModel::evaluate`] within floating-point tolerance.
//!
//! The emitted file depends only on `<math.h>`.

use std::collections::BTreeSet;
use std::fmt::Write;

use crate::defuzz::DefuzzMethod;
use crate::membership::{MembershipFunction, Shape};
use crate::model::{Antecedent, FisModel, FisType, Proposition};

/// Emit a C99 translation unit for a frozen model. `name` prefixes the
/// generated function and is sanitized to a C identifier.
pub fn emit_c(model: &FisModel, name: &str) -> String {
    let name = sanitize(name);
    let mut out = String::new();

    let _ = writeln!(out, "/* Fuzzy inference evaluator: {} ({} system) */", name, model.kind());
    let _ = writeln!(out, "/* Generated by fuzzkit; do not edit. */");
    out.push('\n');
    out.push_str("#include <math.h>\n\n");
    out.push_str("#define FIS_TOL 1e-9\n\n");

    emit_common_helpers(&mut out, model);
    emit_shape_helpers(&mut out, model);
    emit_eval_function(&mut out, model, &name);
    out
}

fn sanitize(name: &str) -> String {
    let mut s: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if s.is_empty() || s.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        s.insert(0, 'f');
    }
    s
}

fn fmt_f(v: f64) -> String {
    format!("{:?}", v)
}

// ============================================================================
// Helper emission
// ============================================================================

fn emit_common_helpers(out: &mut String, model: &FisModel) {
    out.push_str(concat!(
        "static double fis_clamp(double x, double lo, double hi)\n",
        "{\n",
        "    return (x < lo) ? lo : ((x > hi) ? hi : x);\n",
        "}\n\n",
    ));

    let rb = model.rule_base();
    let and_body = match rb.and_op() {
        crate::model::AndOp::Min => "return (a < b) ? a : b;",
        crate::model::AndOp::Product => "return a * b;",
    };
    let or_body = match rb.or_op() {
        crate::model::OrOp::Max => "return (a > b) ? a : b;",
        crate::model::OrOp::Probor => "return a + b - a * b;",
    };
    let _ = writeln!(
        out,
        "static double fis_and(double a, double b)\n{{\n    {}\n}}\n",
        and_body
    );
    let _ = writeln!(
        out,
        "static double fis_or(double a, double b)\n{{\n    {}\n}}\n",
        or_body
    );

    if model.kind() == FisType::Mamdani {
        let imp_body = match rb.implication() {
            crate::model::Implication::Min => "return (w < v) ? w : v;",
            crate::model::Implication::Product => "return w * v;",
        };
        let agg_body = match rb.aggregation() {
            crate::model::Aggregation::Max => "return (a > b) ? a : b;",
            crate::model::Aggregation::Probor => "return a + b - a * b;",
            crate::model::Aggregation::Sum => "return fis_clamp(a + b, 0.0, 1.0);",
        };
        let _ = writeln!(
            out,
            "static double fis_imp(double w, double v)\n{{\n    {}\n}}\n",
            imp_body
        );
        let _ = writeln!(
            out,
            "static double fis_agg(double a, double b)\n{{\n    {}\n}}\n",
            agg_body
        );
    }
}

/// Shapes referenced anywhere in the model, with helper dependencies.
fn used_shapes(model: &FisModel) -> BTreeSet<&'static str> {
    let mut shapes: Vec<Shape> = Vec::new();
    for var in model.inputs().values().chain(model.outputs().values()) {
        for set in var.sets() {
            shapes.push(set.mf().shape());
        }
    }

    let mut names = BTreeSet::new();
    for s in shapes {
        match s {
            Shape::Triangular => {
                names.insert("tri");
            }
            Shape::Trapezoidal => {
                names.insert("trap");
            }
            Shape::GBell => {
                names.insert("gbell");
            }
            Shape::Gaussian => {
                names.insert("gauss");
            }
            Shape::Gauss2 => {
                names.insert("gauss");
                names.insert("gauss2");
            }
            Shape::Sigmoid => {
                names.insert("sig");
            }
            Shape::DSigmoid | Shape::PSigmoid => {
                names.insert("sig");
            }
            Shape::PiShape => {
                names.insert("smf");
                names.insert("zmf");
            }
            Shape::SShape => {
                names.insert("smf");
            }
            Shape::ZShape => {
                names.insert("zmf");
            }
            Shape::Singleton => {
                names.insert("singleton");
            }
            Shape::Rectangle => {
                names.insert("rect");
            }
            Shape::Cosine => {
                names.insert("cosine");
            }
            Shape::Spike => {
                names.insert("spike");
            }
            Shape::Concave => {
                names.insert("concave");
            }
            Shape::LinearS | Shape::LinearZ => {
                names.insert("lins");
            }
            Shape::Constant | Shape::Linear => {}
        }
    }
    names
}

fn emit_shape_helpers(out: &mut String, model: &FisModel) {
    for name in used_shapes(model) {
        let body = match name {
            "tri" => concat!(
                "static double fis_tri(double x, double a, double b, double c)\n{\n",
                "    if (x <= a || x >= c) {\n",
                "        return (fabs(x - b) <= FIS_TOL) ? 1.0 : 0.0;\n",
                "    }\n",
                "    if (x < b) { return (x - a) / (b - a); }\n",
                "    if (x > b) { return (c - x) / (c - b); }\n",
                "    return 1.0;\n",
                "}\n",
            ),
            "trap" => concat!(
                "static double fis_trap(double x, double a, double b, double c, double d)\n{\n",
                "    if (x >= b && x <= c) { return 1.0; }\n",
                "    if (x <= a || x >= d) { return 0.0; }\n",
                "    if (x < b) { return (x - a) / (b - a); }\n",
                "    return (d - x) / (d - c);\n",
                "}\n",
            ),
            "gbell" => concat!(
                "static double fis_gbell(double x, double a, double b, double c)\n{\n",
                "    return 1.0 / (1.0 + pow(fabs((x - c) / a), 2.0 * b));\n",
                "}\n",
            ),
            "gauss" => concat!(
                "static double fis_gauss(double x, double s, double c)\n{\n",
                "    double t = (x - c) / s;\n",
                "    return exp(-0.5 * t * t);\n",
                "}\n",
            ),
            "gauss2" => concat!(
                "static double fis_gauss2(double x, double s1, double c1, double s2, double c2)\n{\n",
                "    double f1 = (x <= c1) ? fis_gauss(x, s1, c1) : 1.0;\n",
                "    double f2 = (x <= c2) ? 1.0 : fis_gauss(x, s2, c2);\n",
                "    return f1 * f2;\n",
                "}\n",
            ),
            "sig" => concat!(
                "static double fis_sig(double x, double a, double b)\n{\n",
                "    return 1.0 / (1.0 + exp(-a * (x - b)));\n",
                "}\n",
            ),
            "smf" => concat!(
                "static double fis_smf(double x, double a, double b)\n{\n",
                "    double mid, t;\n",
                "    if (x <= a) { return 0.0; }\n",
                "    if (x >= b) { return 1.0; }\n",
                "    mid = 0.5 * (a + b);\n",
                "    if (x <= mid) { t = (x - a) / (b - a); return 2.0 * t * t; }\n",
                "    t = (x - b) / (b - a);\n",
                "    return 1.0 - 2.0 * t * t;\n",
                "}\n",
            ),
            "zmf" => concat!(
                "static double fis_zmf(double x, double a, double b)\n{\n",
                "    double mid, t;\n",
                "    if (x <= a) { return 1.0; }\n",
                "    if (x >= b) { return 0.0; }\n",
                "    mid = 0.5 * (a + b);\n",
                "    if (x <= mid) { t = (x - a) / (b - a); return 1.0 - 2.0 * t * t; }\n",
                "    t = (x - b) / (b - a);\n",
                "    return 2.0 * t * t;\n",
                "}\n",
            ),
            "singleton" => concat!(
                "static double fis_singleton(double x, double v)\n{\n",
                "    return (fabs(x - v) <= FIS_TOL) ? 1.0 : 0.0;\n",
                "}\n",
            ),
            "rect" => concat!(
                "static double fis_rect(double x, double s, double e)\n{\n",
                "    return (x >= s && x <= e) ? 1.0 : 0.0;\n",
                "}\n",
            ),
            "cosine" => concat!(
                "static double fis_cosine(double x, double c, double w)\n{\n",
                "    if (x < c - 0.5 * w || x > c + 0.5 * w) { return 0.0; }\n",
                "    return 0.5 * (1.0 + cos(2.0 / w * 3.14159265358979323846 * (x - c)));\n",
                "}\n",
            ),
            "spike" => concat!(
                "static double fis_spike(double x, double w, double c)\n{\n",
                "    return exp(-fabs(10.0 * (x - c) / w));\n",
                "}\n",
            ),
            "concave" => concat!(
                "static double fis_concave(double x, double i, double e)\n{\n",
                "    if (i <= e && x < e) { return (e - i) / (2.0 * e - i - x); }\n",
                "    if (i > e && x > e) { return (i - e) / (i + x - 2.0 * e); }\n",
                "    return 1.0;\n",
                "}\n",
            ),
            "lins" => concat!(
                "static double fis_lins(double x, double a, double b)\n{\n",
                "    if (fabs(a - b) <= FIS_TOL) { return (x < a) ? 0.0 : 1.0; }\n",
                "    if (x < a) { return 0.0; }\n",
                "    if (x > b) { return 1.0; }\n",
                "    return (x - a) / (b - a);\n",
                "}\n",
            ),
            _ => continue,
        };
        out.push_str(body);
        out.push('\n');
    }
}

/// Render a membership evaluation (height-scaled) at the C lvalue `x`.
fn mf_expr(mf: &MembershipFunction, x: &str) -> String {
    let p = mf.params();
    let raw = match mf.shape() {
        Shape::Constant => fmt_f(p[0].clamp(0.0, 1.0)),
        Shape::Triangular => format!("fis_tri({}, {}, {}, {})", x, fmt_f(p[0]), fmt_f(p[1]), fmt_f(p[2])),
        Shape::Trapezoidal => format!(
            "fis_trap({}, {}, {}, {}, {})",
            x, fmt_f(p[0]), fmt_f(p[1]), fmt_f(p[2]), fmt_f(p[3])
        ),
        Shape::GBell => format!("fis_gbell({}, {}, {}, {})", x, fmt_f(p[0]), fmt_f(p[1]), fmt_f(p[2])),
        Shape::Gaussian => format!("fis_gauss({}, {}, {})", x, fmt_f(p[0]), fmt_f(p[1])),
        Shape::Gauss2 => format!(
            "fis_gauss2({}, {}, {}, {}, {})",
            x, fmt_f(p[0]), fmt_f(p[1]), fmt_f(p[2]), fmt_f(p[3])
        ),
        Shape::Sigmoid => format!("fis_sig({}, {}, {})", x, fmt_f(p[0]), fmt_f(p[1])),
        Shape::DSigmoid => format!(
            "fabs(fis_sig({x}, {}, {}) - fis_sig({x}, {}, {}))",
            fmt_f(p[0]), fmt_f(p[1]), fmt_f(p[2]), fmt_f(p[3]), x = x
        ),
        Shape::PSigmoid => format!(
            "fabs(fis_sig({x}, {}, {}) * fis_sig({x}, {}, {}))",
            fmt_f(p[0]), fmt_f(p[1]), fmt_f(p[2]), fmt_f(p[3]), x = x
        ),
        Shape::PiShape => format!(
            "fis_smf({x}, {}, {}) * fis_zmf({x}, {}, {})",
            fmt_f(p[0]), fmt_f(p[1]), fmt_f(p[2]), fmt_f(p[3]), x = x
        ),
        Shape::SShape => format!("fis_smf({}, {}, {})", x, fmt_f(p[0]), fmt_f(p[1])),
        Shape::ZShape => format!("fis_zmf({}, {}, {})", x, fmt_f(p[0]), fmt_f(p[1])),
        Shape::Singleton => format!("fis_singleton({}, {})", x, fmt_f(p[0])),
        Shape::Rectangle => format!("fis_rect({}, {}, {})", x, fmt_f(p[0]), fmt_f(p[1])),
        Shape::Cosine => format!("fis_cosine({}, {}, {})", x, fmt_f(p[0]), fmt_f(p[1])),
        Shape::Spike => format!("fis_spike({}, {}, {})", x, fmt_f(p[0]), fmt_f(p[1])),
        Shape::Concave => format!("fis_concave({}, {}, {})", x, fmt_f(p[0]), fmt_f(p[1])),
        Shape::LinearS => format!("fis_lins({}, {}, {})", x, fmt_f(p[0]), fmt_f(p[1])),
        Shape::LinearZ => format!("(1.0 - fis_lins({}, {}, {}))", x, fmt_f(p[0]), fmt_f(p[1])),
        Shape::Linear => "0.0".to_string(),
    };
    if (mf.height() - 1.0).abs() > f64::EPSILON {
        format!("{} * ({})", fmt_f(mf.height()), raw)
    } else {
        raw
    }
}

/// Render a crisp Sugeno consequent over the clamped input locals.
fn crisp_expr(mf: &MembershipFunction) -> String {
    match mf.shape() {
        Shape::Constant => fmt_f(mf.params()[0]),
        Shape::Linear => {
            let p = mf.params();
            let mut terms: Vec<String> = p[..p.len() - 1]
                .iter()
                .enumerate()
                .map(|(i, k)| format!("{} * x{}", fmt_f(*k), i))
                .collect();
            terms.push(fmt_f(p[p.len() - 1]));
            terms.join(" + ")
        }
        _ => "0.0".to_string(),
    }
}

/// Render a Tsukamoto inverse at the strength lvalue `w`.
fn invert_expr(mf: &MembershipFunction, w: &str, min: f64, max: f64) -> String {
    let p = mf.params();
    let h = mf.height();
    let wn = if (h - 1.0).abs() > f64::EPSILON {
        format!("fis_clamp({} / {}, 0.0, 1.0)", w, fmt_f(h))
    } else {
        w.to_string()
    };
    let core = match mf.shape() {
        Shape::Sigmoid => format!(
            "(({wn}) >= 1.0 - FIS_TOL ? {sat_hi} : (({wn}) <= FIS_TOL ? {sat_lo} : \
             {b} - log(1.0 / ({wn}) - 1.0) / {a}))",
            a = fmt_f(p[0]),
            b = fmt_f(p[1]),
            sat_hi = fmt_f(if p[0] >= 0.0 { max } else { min }),
            sat_lo = fmt_f(if p[0] >= 0.0 { min } else { max }),
            wn = wn
        ),
        Shape::SShape => format!(
            "(({wn}) <= 0.5 ? {a} + {ba} * sqrt(({wn}) / 2.0) : {b} - {ba} * sqrt((1.0 - ({wn})) / 2.0))",
            a = fmt_f(p[0]),
            b = fmt_f(p[1]),
            ba = fmt_f(p[1] - p[0]),
            wn = wn
        ),
        Shape::ZShape => format!(
            "(({wn}) >= 0.5 ? {a} + {ba} * sqrt((1.0 - ({wn})) / 2.0) : {b} - {ba} * sqrt(({wn}) / 2.0))",
            a = fmt_f(p[0]),
            b = fmt_f(p[1]),
            ba = fmt_f(p[1] - p[0]),
            wn = wn
        ),
        Shape::LinearS => format!("{} + ({}) * {}", fmt_f(p[0]), wn, fmt_f(p[1] - p[0])),
        Shape::LinearZ => format!("{} - ({}) * {}", fmt_f(p[1]), wn, fmt_f(p[1] - p[0])),
        Shape::Concave => {
            let (i, e) = (p[0], p[1]);
            if i <= e {
                format!(
                    "(({wn}) <= FIS_TOL ? {min} : {tei} - {ei} / ({wn}))",
                    tei = fmt_f(2.0 * e - i),
                    ei = fmt_f(e - i),
                    min = fmt_f(min),
                    wn = wn
                )
            } else {
                format!(
                    "(({wn}) <= FIS_TOL ? {max} : {tei} + {ie} / ({wn}))",
                    tei = fmt_f(2.0 * e - i),
                    ie = fmt_f(i - e),
                    max = fmt_f(max),
                    wn = wn
                )
            }
        }
        _ => fmt_f(0.5 * (min + max)),
    };
    format!("fis_clamp({}, {}, {})", core, fmt_f(min), fmt_f(max))
}

/// Render an antecedent tree over proposition locals `m<i>`.
fn antecedent_expr(node: &Antecedent, index_of: &impl Fn(Proposition) -> usize) -> String {
    match node {
        Antecedent::Prop(p) => {
            let m = format!("m{}", index_of(*p));
            if p.negated {
                format!("(1.0 - {})", m)
            } else {
                m
            }
        }
        Antecedent::And(l, r) => format!(
            "fis_and({}, {})",
            antecedent_expr(l, index_of),
            antecedent_expr(r, index_of)
        ),
        Antecedent::Or(l, r) => format!(
            "fis_or({}, {})",
            antecedent_expr(l, index_of),
            antecedent_expr(r, index_of)
        ),
    }
}

// ============================================================================
// Function body
// ============================================================================

fn emit_eval_function(out: &mut String, model: &FisModel, name: &str) {
    let rb = model.rule_base();

    // distinct propositions in first-use order
    let mut props: Vec<Proposition> = Vec::new();
    for rule in rb.rules() {
        for p in rule.antecedent.propositions() {
            let key = (p.var, p.set);
            if !props.iter().any(|q| (q.var, q.set) == key) {
                props.push(Proposition { negated: false, ..p });
            }
        }
    }
    let index_of = |p: Proposition| {
        props
            .iter()
            .position(|q| (q.var, q.set) == (p.var, p.set))
            .unwrap_or(0)
    };

    let _ = writeln!(
        out,
        "/* in: {} crisp inputs, out: {} crisp outputs, both in declaration order */",
        model.inputs().len(),
        model.outputs().len()
    );
    let _ = writeln!(out, "int {}_eval(const double *in, double *out)\n{{", name);

    // clamped inputs
    for (i, (iname, var)) in model.inputs().iter().enumerate() {
        let _ = writeln!(
            out,
            "    double x{} = fis_clamp(in[{}], {}, {}); /* {} */",
            i,
            i,
            fmt_f(var.min()),
            fmt_f(var.max()),
            iname
        );
    }
    out.push('\n');

    // fuzzified propositions
    for (j, p) in props.iter().enumerate() {
        let var = model.input_at(p.var).expect("resolved proposition");
        let set = var.set_at(p.set).expect("resolved proposition");
        let _ = writeln!(
            out,
            "    double m{} = {}; /* {} IS {} */",
            j,
            mf_expr(set.mf(), &format!("x{}", p.var)),
            var.name(),
            set.name()
        );
    }
    out.push('\n');

    // firing strengths
    for (r, rule) in rb.rules().iter().enumerate() {
        let expr = antecedent_expr(&rule.antecedent, &index_of);
        let weighted = if (rule.weight - 1.0).abs() > f64::EPSILON {
            format!("{} * ({})", fmt_f(rule.weight), expr)
        } else {
            expr
        };
        let _ = writeln!(
            out,
            "    double w{} = fis_clamp({}, 0.0, 1.0);",
            r, weighted
        );
    }
    out.push('\n');

    for (oi, (oname, _)) in model.outputs().iter().enumerate() {
        let _ = writeln!(out, "    /* output {}: {} */", oi, oname);
        match model.kind() {
            FisType::Mamdani if !model.defuzz().is_weighted() => {
                emit_mamdani_output(out, model, oi)
            }
            FisType::Mamdani => emit_pairs_output(out, model, oi, PairSource::Singleton),
            FisType::Sugeno => emit_pairs_output(out, model, oi, PairSource::Crisp),
            FisType::Tsukamoto => emit_pairs_output(out, model, oi, PairSource::Inverse),
        }
        out.push('\n');
    }

    out.push_str("    return 0;\n}\n");
}

fn emit_mamdani_output(out: &mut String, model: &FisModel, oi: usize) {
    let var = model.output_at(oi).expect("output index");
    let rb = model.rule_base();
    let n = model.resolution();
    let (omin, omax) = var.range();
    let step = (omax - omin) / (n as f64);
    let mid = var.midpoint();

    let _ = writeln!(out, "    {{");
    let _ = writeln!(out, "        int k;");
    let _ = writeln!(out, "        double ys[{}];", n);
    let _ = writeln!(out, "        double sy = 0.0, sxy = 0.0, peak = 0.0;");
    let _ = writeln!(out, "        for (k = 0; k < {}; ++k) {{", n);
    let _ = writeln!(
        out,
        "            double x = {} + ((double)k + 0.5) * {};",
        fmt_f(omin),
        fmt_f(step)
    );
    let _ = writeln!(out, "            double y = 0.0;");
    for (r, rule) in rb.rules().iter().enumerate() {
        for c in rule.consequents.iter().filter(|c| c.var == oi) {
            let set = var.set_at(c.set).expect("resolved consequent");
            let v = mf_expr(set.mf(), "x");
            let v = if c.negated { format!("(1.0 - {})", v) } else { v };
            let _ = writeln!(
                out,
                "            if (w{r} > 0.0) {{ y = fis_agg(y, fis_imp(w{r}, {v})); }}",
                r = r,
                v = v
            );
        }
    }
    out.push_str(concat!(
        "            ys[k] = y;\n",
        "            sxy += x * y;\n",
        "            sy += y;\n",
        "            if (y > peak) { peak = y; }\n",
        "        }\n",
    ));

    let fallback = format!(
        "        if (sy <= FIS_TOL) {{ out[{}] = {}; }}\n        else {{\n",
        oi,
        fmt_f(mid)
    );
    match model.defuzz() {
        DefuzzMethod::Centroid => {
            out.push_str(&fallback);
            let _ = writeln!(out, "            out[{}] = sxy / sy;", oi);
            out.push_str("        }\n");
        }
        DefuzzMethod::Bisector => {
            out.push_str(&fallback);
            out.push_str(concat!(
                "            double half = 0.5 * sy, cum = 0.0;\n",
                "            for (k = 0; k < ",
            ));
            let _ = write!(out, "{}", n);
            out.push_str("; ++k) {\n");
            out.push_str("                cum += ys[k];\n");
            out.push_str("                if (cum >= half) { break; }\n");
            out.push_str("            }\n");
            let _ = writeln!(
                out,
                "            out[{}] = {} + ((double)k + 0.5) * {};",
                oi,
                fmt_f(omin),
                fmt_f(step)
            );
            out.push_str("        }\n");
        }
        DefuzzMethod::MeanOfMaximum
        | DefuzzMethod::SmallestOfMaximum
        | DefuzzMethod::LargestOfMaximum => {
            let _ = writeln!(
                out,
                "        if (peak <= FIS_TOL) {{ out[{}] = {}; }}\n        else {{",
                oi,
                fmt_f(mid)
            );
            out.push_str(concat!(
                "            double msum = 0.0, mfirst = 0.0, mlast = 0.0;\n",
                "            int mn = 0;\n",
                "            for (k = 0; k < ",
            ));
            let _ = write!(out, "{}", n);
            out.push_str("; ++k) {\n");
            let _ = writeln!(
                out,
                "                double x = {} + ((double)k + 0.5) * {};",
                fmt_f(omin),
                fmt_f(step)
            );
            out.push_str(concat!(
                "                if (fabs(peak - ys[k]) <= FIS_TOL) {\n",
                "                    if (mn == 0) { mfirst = x; }\n",
                "                    mlast = x;\n",
                "                    msum += x;\n",
                "                    ++mn;\n",
                "                }\n",
                "            }\n",
            ));
            let pick = match model.defuzz() {
                DefuzzMethod::MeanOfMaximum => "msum / (double)mn",
                DefuzzMethod::SmallestOfMaximum => "mfirst",
                _ => "mlast",
            };
            let _ = writeln!(out, "            out[{}] = {};", oi, pick);
            out.push_str("        }\n");
        }
        _ => {}
    }
    let _ = writeln!(
        out,
        "        out[{oi}] = fis_clamp(out[{oi}], {}, {});",
        fmt_f(omin),
        fmt_f(omax),
        oi = oi
    );
    out.push_str("    }\n");
}

enum PairSource {
    Crisp,
    Inverse,
    Singleton,
}

fn emit_pairs_output(out: &mut String, model: &FisModel, oi: usize, source: PairSource) {
    let var = model.output_at(oi).expect("output index");
    let rb = model.rule_base();
    let (omin, omax) = var.range();
    let mid = var.midpoint();

    let _ = writeln!(out, "    {{");
    let _ = writeln!(out, "        double num = 0.0, den = 0.0;");
    let _ = writeln!(out, "        int fired = 0;");
    for (r, rule) in rb.rules().iter().enumerate() {
        for c in rule.consequents.iter().filter(|c| c.var == oi) {
            let set = var.set_at(c.set).expect("resolved consequent");
            let (weight, z) = match source {
                PairSource::Crisp => (format!("w{}", r), crisp_expr(set.mf())),
                PairSource::Inverse => (
                    format!("w{}", r),
                    invert_expr(set.mf(), &format!("w{}", r), omin, omax),
                ),
                PairSource::Singleton => (
                    format!("fis_imp(w{}, {})", r, fmt_f(set.mf().height())),
                    fmt_f(set.mf().params()[0]),
                ),
            };
            let _ = writeln!(out, "        if (w{} > 0.0) {{", r);
            let _ = writeln!(out, "            double z = {};", z);
            let _ = writeln!(out, "            num += {} * z;", weight);
            let _ = writeln!(out, "            den += {};", weight);
            out.push_str("            fired = 1;\n");
            out.push_str("        }\n");
        }
    }
    match model.defuzz() {
        DefuzzMethod::WeightedSum => {
            let _ = writeln!(out, "        out[{}] = fired ? num : {};", oi, fmt_f(mid));
        }
        _ => {
            let _ = writeln!(
                out,
                "        out[{}] = (den > FIS_TOL) ? (num / den) : {};",
                oi,
                fmt_f(mid)
            );
        }
    }
    let _ = writeln!(
        out,
        "        out[{oi}] = fis_clamp(out[{oi}], {}, {});",
        fmt_f(omin),
        fmt_f(omax),
        oi = oi
    );
    out.push_str("    }\n");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::Shape;
    use crate::model::{FisType, ModelBuilder};

    fn mamdani_model() -> FisModel {
        let mut b = ModelBuilder::new(FisType::Mamdani);
        b.add_input("temperature", 0.0, 40.0).unwrap();
        b.add_output("fan", 0.0, 100.0).unwrap();
        b.add_set("temperature", "Cold", Shape::Trapezoidal, &[0.0, 0.0, 10.0, 20.0])
            .unwrap();
        b.add_set("temperature", "Hot", Shape::Trapezoidal, &[20.0, 30.0, 40.0, 40.0])
            .unwrap();
        b.add_set("fan", "Low", Shape::Triangular, &[0.0, 0.0, 50.0]).unwrap();
        b.add_set("fan", "High", Shape::Triangular, &[50.0, 100.0, 100.0]).unwrap();
        b.add_rule_text("IF temperature IS Cold THEN fan IS Low").unwrap();
        b.add_rule_text("IF temperature IS Hot THEN fan IS High").unwrap();
        b.build().unwrap()
    }

    #[test]
    fn test_emit_mamdani_structure() {
        let c = emit_c(&mamdani_model(), "fan-ctl");
        assert!(c.contains("int fan_ctl_eval(const double *in, double *out)"));
        assert!(c.contains("#include <math.h>"));
        assert!(c.contains("fis_trap"));
        assert!(c.contains("fis_tri"));
        assert!(c.contains("double w0"));
        assert!(c.contains("double w1"));
        assert!(c.contains("sxy / sy"));
        // clamped input and fallback midpoint present
        assert!(c.contains("fis_clamp(in[0], 0.0, 40.0)"));
        assert!(c.contains("50.0"));
    }

    #[test]
    fn test_emit_sugeno_structure() {
        let mut b = ModelBuilder::new(FisType::Sugeno);
        b.add_input("x", 0.0, 1.0).unwrap();
        b.add_output("y", 0.0, 100.0).unwrap();
        b.add_set("x", "low", Shape::LinearZ, &[0.0, 1.0]).unwrap();
        b.add_set("y", "plane", Shape::Linear, &[2.0, 5.0]).unwrap();
        b.add_rule_text("IF x IS low THEN y IS plane").unwrap();
        let model = b.build().unwrap();

        let c = emit_c(&model, "s");
        assert!(c.contains("int s_eval"));
        assert!(c.contains("2.0 * x0 + 5.0"));
        assert!(c.contains("num / den"));
    }

    #[test]
    fn test_emit_tsukamoto_structure() {
        let mut b = ModelBuilder::new(FisType::Tsukamoto);
        b.add_input("x", 0.0, 10.0).unwrap();
        b.add_output("y", 0.0, 100.0).unwrap();
        b.add_set("x", "small", Shape::ZShape, &[2.0, 8.0]).unwrap();
        b.add_set("y", "rising", Shape::LinearS, &[0.0, 100.0]).unwrap();
        b.add_rule_text("IF x IS small THEN y IS rising").unwrap();
        let model = b.build().unwrap();

        let c = emit_c(&model, "t");
        assert!(c.contains("int t_eval"));
        // linear_s inverse: a + w * (b - a)
        assert!(c.contains("0.0 + (w0) * 100.0"));
    }

    #[test]
    fn test_proposition_locals_are_shared() {
        let mut b = ModelBuilder::new(FisType::Mamdani);
        b.add_input("x", 0.0, 10.0).unwrap();
        b.add_output("y", 0.0, 10.0).unwrap();
        b.add_set("x", "hot", Shape::SShape, &[0.0, 10.0]).unwrap();
        b.add_set("y", "on", Shape::Triangular, &[0.0, 5.0, 10.0]).unwrap();
        b.add_rule_text("IF x IS hot THEN y IS on").unwrap();
        b.add_rule_text("IF x IS NOT hot THEN y IS on WITH 0.5").unwrap();
        let model = b.build().unwrap();

        let c = emit_c(&model, "m");
        // one shared membership local, negated at use
        assert_eq!(c.matches("double m0 =").count(), 1);
        assert!(!c.contains("double m1 ="));
        assert!(c.contains("(1.0 - m0)"));
        assert!(c.contains("0.5 * ((1.0 - m0))") || c.contains("0.5 * (1.0 - m0)"));
    }

    #[test]
    fn test_function_name_sanitized() {
        let c = emit_c(&mamdani_model(), "2-fan ctl");
        assert!(c.contains("int f2_fan_ctl_eval"));
    }
}
