//! Triangle counting by masked matrix multiplication
//!
//! Every intermediate (the triangular halves, the count matrix and the tuple
//! buffers of the fallback decomposition) is owned by the call and released
//! when it goes out of scope, on success and on every error path.

use crate::decompose::{TriangularDecomposer, TriangularParts};
use crate::error::{EngineResultExt, TriCountError, TriCountResult};
use crate::method::{Method, MethodPlan, Operand};
use crate::semiring::SemiringSelector;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tricount_sparse::{ElementType, SparseEngine};

/// Triangle counter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriCountConfig {
    /// Method used by `count_default`
    pub default_method: Method,
    /// Return an error instead of truncating when the raw sum is not a
    /// multiple of the method's divisor. When unset, debug builds panic on
    /// such a sum through `debug_assert!`; release builds log a warning and
    /// truncate.
    pub strict_divisibility: bool,
}

impl Default for TriCountConfig {
    fn default() -> Self {
        Self {
            default_method: Method::SandiaDot,
            strict_divisibility: false,
        }
    }
}

/// The masked product of one method, before reduction
#[derive(Debug)]
pub struct CountProduct<M> {
    pub plan: MethodPlan,
    /// `C<mask> = left * right`
    pub count: M,
    pub parts: TriangularParts<M>,
}

impl<M> CountProduct<M> {
    /// The matrix that masked the product
    pub fn mask<'a>(&'a self, a: &'a M) -> TriCountResult<&'a M> {
        resolve(self.plan.mask, a, &self.parts)
    }
}

/// Counts triangles in symmetric, loop-free adjacency matrices.
///
/// Capabilities are negotiated once, at construction. When the engine lacks
/// the pair operator, input matrices must hold only 0 and 1; results for
/// unsymmetric or self-looped inputs are unspecified.
pub struct TriangleCounter<'e, E: SparseEngine> {
    engine: &'e E,
    selector: SemiringSelector,
    decomposer: TriangularDecomposer,
    config: TriCountConfig,
}

impl<'e, E: SparseEngine> TriangleCounter<'e, E> {
    pub fn new(engine: &'e E) -> Self {
        Self::with_config(engine, TriCountConfig::default())
    }

    pub fn with_config(engine: &'e E, config: TriCountConfig) -> Self {
        let capabilities = engine.capabilities();
        let selector = SemiringSelector::negotiate(&capabilities);
        let decomposer = TriangularDecomposer::negotiate(&capabilities);
        debug!(
            "Negotiated triangle counting: structural = {}, decomposition = {:?}",
            selector.is_structural(),
            decomposer.strategy()
        );
        TriangleCounter {
            engine,
            selector,
            decomposer,
            config,
        }
    }

    pub fn engine(&self) -> &'e E {
        self.engine
    }

    pub fn config(&self) -> &TriCountConfig {
        &self.config
    }

    pub fn selector(&self) -> &SemiringSelector {
        &self.selector
    }

    pub fn decomposer(&self) -> &TriangularDecomposer {
        &self.decomposer
    }

    /// Count the triangles of `a` with `method`
    pub fn count(&self, a: &E::Matrix, method: Method) -> TriCountResult<u64> {
        let product = self.masked_product(a, method)?;
        let raw = self
            .engine
            .reduce(self.selector.reduction_monoid(), &product.count)
            .context("reducing count matrix")?;
        drop(product);

        let ntri = self.normalize(method, raw)?;
        debug!("{} counted {} triangles (raw sum {})", method, ntri, raw);
        Ok(ntri)
    }

    /// Count with the configured default method
    pub fn count_default(&self, a: &E::Matrix) -> TriCountResult<u64> {
        self.count(a, self.config.default_method)
    }

    /// Count with a numeric selector (1 through 6), rejected before any
    /// allocation when unknown
    pub fn count_by_id(&self, a: &E::Matrix, method_id: i64) -> TriCountResult<u64> {
        let method = Method::try_from(method_id)?;
        self.count(a, method)
    }

    /// Build the halves `method` needs and compute its masked product
    pub fn masked_product(
        &self,
        a: &E::Matrix,
        method: Method,
    ) -> TriCountResult<CountProduct<E::Matrix>> {
        let plan = method.plan();
        debug!("Counting triangles with {}: {}", method, self.formula(&plan));

        let parts = self
            .decomposer
            .extract(self.engine, a, plan.needs_lower(), plan.needs_upper())?;
        let n = self.engine.nrows(a);
        let mut count = self
            .engine
            .new_matrix(ElementType::Int64, n, n)
            .context("allocating count matrix")?;

        let mask = resolve(plan.mask, a, &parts)?;
        let left = resolve(plan.left, a, &parts)?;
        let right = resolve(plan.right, a, &parts)?;
        self.engine
            .mxm(
                &mut count,
                Some(mask),
                self.selector.semiring(),
                left,
                right,
                self.selector.descriptor(plan.kind()),
            )
            .context("computing masked product")?;

        Ok(CountProduct { plan, count, parts })
    }

    /// The product as executed, e.g. `C<L> = L * U'`
    fn formula(&self, plan: &MethodPlan) -> String {
        let transposed = self.selector.needs_transpose_descriptor(plan.kind());
        format!(
            "C<{}> = {} * {}{}",
            plan.mask,
            plan.left,
            plan.right,
            if transposed { "'" } else { "" }
        )
    }

    fn normalize(&self, method: Method, raw: i64) -> TriCountResult<u64> {
        let divisor = method.plan().divisor;
        let divisible = raw >= 0 && raw % divisor == 0;
        if !divisible {
            if self.config.strict_divisibility {
                return Err(TriCountError::PreconditionViolated {
                    method,
                    raw,
                    divisor,
                });
            }
            warn!(
                "{} raw sum {} is not a nonnegative multiple of {}; \
                 input is not a symmetric loop-free adjacency matrix",
                method, raw, divisor
            );
        }
        debug_assert!(divisible, "{} raw sum {} not divisible by {}", method, raw, divisor);
        Ok(u64::try_from(raw / divisor).unwrap_or(0))
    }
}

/// Count the triangles of `a` using a numeric method selector
pub fn count_triangles<E: SparseEngine>(
    engine: &E,
    a: &E::Matrix,
    method_id: i64,
) -> TriCountResult<u64> {
    let method = Method::try_from(method_id)?;
    TriangleCounter::new(engine).count(a, method)
}

fn resolve<'a, M>(
    operand: Operand,
    a: &'a M,
    parts: &'a TriangularParts<M>,
) -> TriCountResult<&'a M> {
    match operand {
        Operand::Adjacency => Ok(a),
        half => parts.get(half).ok_or(TriCountError::MissingOperand(half)),
    }
}
