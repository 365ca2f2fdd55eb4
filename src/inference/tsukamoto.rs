//! Tsukamoto inference
//!
//! Consequent sets must be monotonic; each firing rule contributes
//! (strength, f_inverse(strength)) where the inverse saturates into the
//! output domain. The pairs feed the same weighted defuzzification as
//! Sugeno. Monotonicity is validated at build, but the check is
//! repeated here so the error class stays on the evaluation path.

use indexmap::IndexMap;

use crate::defuzz::defuzzify_pairs;
use crate::error::{FisError, FisResult};
use crate::model::FisModel;

use super::{EvaluationContext, InferenceStrategy};

pub(crate) struct TsukamotoInference;

impl InferenceStrategy for TsukamotoInference {
    fn infer(
        &self,
        model: &FisModel,
        ctx: &mut EvaluationContext,
    ) -> FisResult<IndexMap<String, f64>> {
        let rb = model.rule_base();
        let mut outputs = IndexMap::with_capacity(model.outputs().len());

        for (oi, (name, var)) in model.outputs().iter().enumerate() {
            let mut pairs = Vec::new();
            for (ri, rule) in rb.rules().iter().enumerate() {
                let w = ctx.strength(ri);
                for c in rule.consequents.iter().filter(|c| c.var == oi) {
                    let Some(set) = var.set_at(c.set) else { continue };
                    if set.mf().monotonicity().is_none() {
                        return Err(FisError::non_monotonic(name, set.name()));
                    }
                    if w <= 0.0 {
                        continue;
                    }
                    let z = set.mf().invert(w, var.range());
                    pairs.push((w, z));
                }
            }

            let crisp = match defuzzify_pairs(model.defuzz(), &pairs) {
                Some(v) => v,
                None => {
                    ctx.warn_no_rule_fired(name);
                    var.midpoint()
                }
            };
            outputs.insert(name.clone(), var.clamp(crisp));
        }

        Ok(outputs)
    }
}
