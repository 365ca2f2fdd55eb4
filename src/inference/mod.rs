//! Inference engine
//!
//! Three state-free strategies over the same rule base:
//!
//! - [`mamdani`]: clip (min) or scale (product) each consequent set by
//!   the rule's firing strength, aggregate pointwise across the sampled
//!   output domain, then defuzzify the aggregated set
//! - [`sugeno`]: evaluate each crisp consequent function, pair it with
//!   the firing strength, and defuzzify the pairs directly
//! - [`tsukamoto`]: invert each monotonic consequent set at the firing
//!   strength, then defuzzify the pairs like Sugeno
//!
//! Evaluation is a pure function of (model, inputs): the model is read
//! but never written, all transient state lives in the per-call
//! [`EvaluationContext`], and a call either completes or fails
//! synchronously. Cost scales linearly with resolution x outputs x
//! rules; the resolution is the only unbounded parameter.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::FisResult;
use crate::model::{FisModel, FisType};

mod context;
mod mamdani;
mod sugeno;
mod tsukamoto;

pub use context::{EvalWarning, Evaluation, WarningKind};
pub(crate) use context::EvaluationContext;
pub(crate) use mamdani::MamdaniInference;
pub(crate) use sugeno::SugenoInference;
pub(crate) use tsukamoto::TsukamotoInference;

/// A state-free inference strategy consuming the frozen model and a
/// per-call context, producing one crisp value per output variable.
pub(crate) trait InferenceStrategy {
    fn infer(
        &self,
        model: &FisModel,
        ctx: &mut EvaluationContext,
    ) -> FisResult<IndexMap<String, f64>>;
}

/// Evaluate a frozen model against crisp inputs.
pub(crate) fn evaluate(
    model: &FisModel,
    inputs: &HashMap<String, f64>,
) -> FisResult<Evaluation> {
    let mut ctx = EvaluationContext::new(model, inputs)?;
    ctx.compute_strengths();

    let strategy: &dyn InferenceStrategy = match model.kind() {
        FisType::Mamdani => &MamdaniInference,
        FisType::Sugeno => &SugenoInference,
        FisType::Tsukamoto => &TsukamotoInference,
    };
    let outputs = strategy.infer(model, &mut ctx)?;
    Ok(Evaluation::new(outputs, ctx.take_warnings()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defuzz::DefuzzMethod;
    use crate::membership::Shape;
    use crate::model::{AndOp, FisType, ModelBuilder, OrOp};
    use std::sync::Arc;

    fn fan_model() -> FisModel {
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

    fn eval(model: &FisModel, pairs: &[(&str, f64)]) -> Evaluation {
        let map: HashMap<String, f64> =
            pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        model.evaluate(&map).unwrap()
    }

    #[test]
    fn test_mamdani_centroid_scenario() {
        let model = fan_model();
        let result = eval(&model, &[("temperature", 15.0)]);
        let fan = result.value("fan").unwrap();

        // centroids of the unclipped consequents
        let low_centroid = 50.0 / 3.0;
        let high_centroid = 100.0 - 50.0 / 3.0;
        assert!(fan > low_centroid && fan < high_centroid, "fan = {}", fan);
        assert!((fan - low_centroid).abs() < (fan - high_centroid).abs());
        assert!(result.all_rules_fired());
    }

    #[test]
    fn test_evaluation_is_bit_for_bit_reproducible() {
        let model = fan_model();
        let a = eval(&model, &[("temperature", 15.0)]).value("fan").unwrap();
        for _ in 0..5 {
            let b = eval(&model, &[("temperature", 15.0)]).value("fan").unwrap();
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_mamdani_cold_end_pulls_low() {
        let model = fan_model();
        let cold = eval(&model, &[("temperature", 2.0)]).value("fan").unwrap();
        let hot = eval(&model, &[("temperature", 38.0)]).value("fan").unwrap();
        assert!(cold < 35.0, "cold fan = {}", cold);
        assert!(hot > 65.0, "hot fan = {}", hot);
    }

    #[test]
    fn test_out_of_range_input_saturates() {
        let model = fan_model();
        let below = eval(&model, &[("temperature", -100.0)]).value("fan").unwrap();
        let at_min = eval(&model, &[("temperature", 0.0)]).value("fan").unwrap();
        assert_eq!(below.to_bits(), at_min.to_bits());
    }

    #[test]
    fn test_no_rule_fired_fallback_is_midpoint() {
        // sets leave a gap: nothing covers the middle of the domain
        let mut b = ModelBuilder::new(FisType::Mamdani);
        b.add_input("x", 0.0, 10.0).unwrap();
        b.add_output("y", 0.0, 50.0).unwrap();
        b.add_set("x", "low", Shape::Triangular, &[0.0, 1.0, 2.0]).unwrap();
        b.add_set("y", "some", Shape::Triangular, &[0.0, 25.0, 50.0]).unwrap();
        b.add_rule_text("IF x IS low THEN y IS some").unwrap();
        let model = b.build().unwrap();

        let result = eval(&model, &[("x", 8.0)]);
        assert_eq!(result.value("y").unwrap(), 25.0);
        assert!(!result.all_rules_fired());
        assert_eq!(result.warnings().len(), 1);
        assert_eq!(result.warnings()[0].kind, WarningKind::NoRuleFired);

        // a firing input produces no warning
        let result = eval(&model, &[("x", 1.0)]);
        assert!(result.all_rules_fired());
    }

    #[test]
    fn test_sugeno_weighted_average_scenario() {
        // firing strengths 0.2 and 0.8 against crisp consequents 10 and 30
        let mut b = ModelBuilder::new(FisType::Sugeno);
        b.add_input("x", 0.0, 1.0).unwrap();
        b.add_output("y", 0.0, 100.0).unwrap();
        b.add_set("x", "low", Shape::LinearZ, &[0.0, 1.0]).unwrap();
        b.add_set("x", "high", Shape::LinearS, &[0.0, 1.0]).unwrap();
        b.add_set("y", "ten", Shape::Constant, &[10.0]).unwrap();
        b.add_set("y", "thirty", Shape::Constant, &[30.0]).unwrap();
        b.add_rule_text("IF x IS low THEN y IS ten").unwrap();
        b.add_rule_text("IF x IS high THEN y IS thirty").unwrap();
        let model = b.build().unwrap();

        let y = eval(&model, &[("x", 0.8)]).value("y").unwrap();
        assert!((y - 26.0).abs() < 1e-9, "y = {}", y);
    }

    #[test]
    fn test_sugeno_linear_consequent_uses_inputs() {
        let mut b = ModelBuilder::new(FisType::Sugeno);
        b.add_input("a", 0.0, 10.0).unwrap();
        b.add_input("b", 0.0, 10.0).unwrap();
        b.add_output("y", -100.0, 100.0).unwrap();
        b.add_set("a", "any", Shape::Constant, &[1.0]).unwrap();
        // y = 2a - b + 1
        b.add_set("y", "plane", Shape::Linear, &[2.0, -1.0, 1.0]).unwrap();
        b.add_rule_text("IF a IS any THEN y IS plane").unwrap();
        let model = b.build().unwrap();

        let y = eval(&model, &[("a", 3.0), ("b", 4.0)]).value("y").unwrap();
        assert!((y - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_tsukamoto_inverts_consequent() {
        let mut b = ModelBuilder::new(FisType::Tsukamoto);
        b.add_input("x", 0.0, 10.0).unwrap();
        b.add_output("y", 0.0, 100.0).unwrap();
        b.add_set("x", "small", Shape::ZShape, &[2.0, 8.0]).unwrap();
        b.add_set("y", "rising", Shape::LinearS, &[0.0, 100.0]).unwrap();
        b.add_rule_text("IF x IS small THEN y IS rising").unwrap();
        let model = b.build().unwrap();

        // zmf(5; 2, 8) = 0.5, so y = invert(0.5) = 50
        let y = eval(&model, &[("x", 5.0)]).value("y").unwrap();
        assert!((y - 50.0).abs() < 1e-9, "y = {}", y);
    }

    #[test]
    fn test_firing_strength_monotonic_under_min_max() {
        // with AND=min / OR=max, raising a membership degree never
        // lowers a firing strength
        let mut b = ModelBuilder::new(FisType::Mamdani);
        b.add_input("x", 0.0, 10.0).unwrap();
        b.add_output("y", 0.0, 10.0).unwrap();
        b.add_set("x", "big", Shape::LinearS, &[0.0, 10.0]).unwrap();
        b.add_set("y", "on", Shape::Triangular, &[0.0, 5.0, 10.0]).unwrap();
        b.and_op(AndOp::Min).unwrap();
        b.or_op(OrOp::Max).unwrap();
        b.add_rule_text("IF x IS big THEN y IS on").unwrap();
        let model = b.build().unwrap();

        let mut last = -1.0;
        for i in 0..=10 {
            let x = i as f64;
            let map = HashMap::from([("x".to_string(), x)]);
            let mut ctx = EvaluationContext::new(&model, &map).unwrap();
            ctx.compute_strengths();
            let s = ctx.strength(0);
            assert!(s >= last - 1e-12, "strength dropped at x={}", x);
            last = s;
        }
    }

    #[test]
    fn test_weighted_mamdani_singleton_outputs() {
        let mut b = ModelBuilder::new(FisType::Mamdani);
        b.add_input("x", 0.0, 1.0).unwrap();
        b.add_output("y", 0.0, 100.0).unwrap();
        b.add_set("x", "low", Shape::LinearZ, &[0.0, 1.0]).unwrap();
        b.add_set("x", "high", Shape::LinearS, &[0.0, 1.0]).unwrap();
        b.add_set("y", "ten", Shape::Singleton, &[10.0]).unwrap();
        b.add_set("y", "thirty", Shape::Singleton, &[30.0]).unwrap();
        b.add_rule_text("IF x IS low THEN y IS ten").unwrap();
        b.add_rule_text("IF x IS high THEN y IS thirty").unwrap();
        b.defuzz(DefuzzMethod::WeightedAverage).unwrap();
        let model = b.build().unwrap();

        let y = eval(&model, &[("x", 0.8)]).value("y").unwrap();
        assert!((y - 26.0).abs() < 1e-9, "y = {}", y);
    }

    #[test]
    fn test_concurrent_evaluation() {
        let model = Arc::new(fan_model());
        let mut handles = Vec::new();
        for i in 0..4 {
            let m = Arc::clone(&model);
            handles.push(std::thread::spawn(move || {
                let map = HashMap::from([("temperature".to_string(), 5.0 * i as f64)]);
                m.evaluate(&map).unwrap().value("fan").unwrap()
            }));
        }
        let sequential: Vec<f64> = (0..4)
            .map(|i| {
                eval(&model, &[("temperature", 5.0 * i as f64)])
                    .value("fan")
                    .unwrap()
            })
            .collect();
        for (h, expect) in handles.into_iter().zip(sequential) {
            assert_eq!(h.join().unwrap().to_bits(), expect.to_bits());
        }
    }

    #[test]
    fn test_rule_text_round_trip() {
        let model = fan_model();
        let texts = model.rule_texts();
        assert_eq!(texts[0], "IF temperature IS Cold THEN fan IS Low");

        // rebuild from the re-serialized rules; outputs must match
        let mut b = ModelBuilder::new(FisType::Mamdani);
        b.add_input("temperature", 0.0, 40.0).unwrap();
        b.add_output("fan", 0.0, 100.0).unwrap();
        b.add_set("temperature", "Cold", Shape::Trapezoidal, &[0.0, 0.0, 10.0, 20.0])
            .unwrap();
        b.add_set("temperature", "Hot", Shape::Trapezoidal, &[20.0, 30.0, 40.0, 40.0])
            .unwrap();
        b.add_set("fan", "Low", Shape::Triangular, &[0.0, 0.0, 50.0]).unwrap();
        b.add_set("fan", "High", Shape::Triangular, &[50.0, 100.0, 100.0]).unwrap();
        for t in &texts {
            b.add_rule_text(t).unwrap();
        }
        let rebuilt = b.build().unwrap();
        assert_eq!(model.rule_base().rules(), rebuilt.rule_base().rules());

        let a = eval(&model, &[("temperature", 13.0)]).value("fan").unwrap();
        let b = eval(&rebuilt, &[("temperature", 13.0)]).value("fan").unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }
}
