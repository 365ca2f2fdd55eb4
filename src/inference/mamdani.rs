//! Mamdani inference
//!
//! Each rule's consequent set is clipped (min) or scaled (product) by
//! the firing strength per the rule base implication operator; clipped
//! sets are aggregated pointwise across the sampled output domain with
//! the aggregation operator. The resulting aggregated set is handed to
//! the sampled defuzzifiers.
//!
//! Weighted defuzzifiers bypass the sampled aggregation: they are only
//! accepted at build when every consequent set is a singleton, so the
//! engine degenerates to (strength, singleton position) pairs.

use indexmap::IndexMap;

use crate::defuzz::{defuzzify_pairs, defuzzify_sampled, AggregatedSet};
use crate::error::FisResult;
use crate::model::FisModel;

use super::{EvaluationContext, InferenceStrategy};

pub(crate) struct MamdaniInference;

impl InferenceStrategy for MamdaniInference {
    fn infer(
        &self,
        model: &FisModel,
        ctx: &mut EvaluationContext,
    ) -> FisResult<IndexMap<String, f64>> {
        if model.defuzz().is_weighted() {
            return infer_singleton(model, ctx);
        }

        let rb = model.rule_base();
        let mut outputs = IndexMap::with_capacity(model.outputs().len());

        for (oi, (name, var)) in model.outputs().iter().enumerate() {
            let mut agg = AggregatedSet::new(var.min(), var.max(), model.resolution());
            for i in 0..agg.resolution() {
                let x = agg.x_at(i);
                let mut y = 0.0;
                for (ri, rule) in rb.rules().iter().enumerate() {
                    let w = ctx.strength(ri);
                    if w <= 0.0 {
                        continue;
                    }
                    for c in rule.consequents.iter().filter(|c| c.var == oi) {
                        let Some(set) = var.set_at(c.set) else { continue };
                        let mut v = set.membership(x);
                        if c.negated {
                            v = 1.0 - v;
                        }
                        y = rb.aggregation().apply(y, rb.implication().apply(w, v));
                    }
                }
                agg.ys_mut()[i] = y;
            }

            let crisp = match defuzzify_sampled(model.defuzz(), &agg) {
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

/// Weighted-average/sum over singleton consequents: each firing rule
/// contributes (implication(w, height), singleton position).
fn infer_singleton(
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
                let activation = rb.implication().apply(w, set.mf().height());
                pairs.push((activation, set.mf().params()[0]));
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
