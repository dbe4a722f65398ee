//! Small extensions over `nalgebra_sparse` matrices.

pub(crate) mod conj;
