//! Sugeno inference
//!
//! Consequents are crisp functions of the current inputs: a constant,
//! or an affine combination k1*x1 + ... + kn*xn + k0. Each firing rule
//! contributes a (strength, value) pair; there is no aggregation over a
//! sampled domain. Zero-strength rules are excluded so an all-zero call
//! falls back to the domain midpoint instead of dividing 0 by 0.

use indexmap::IndexMap;

use crate::defuzz::defuzzify_pairs;
use crate::error::FisResult;
use crate::model::FisModel;

use super::{EvaluationContext, InferenceStrategy};

pub(crate) struct SugenoInference;

impl InferenceStrategy for SugenoInference {
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
                if w <= 0.0 {
                    continue;
                }
                for c in rule.consequents.iter().filter(|c| c.var == oi) {
                    let Some(set) = var.set_at(c.set) else { continue };
                    let z = set.mf().evaluate_crisp(ctx.inputs());
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
