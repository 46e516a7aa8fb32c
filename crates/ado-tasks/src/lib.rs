//! Task and model catalogue for adaptive design optimization.
//!
//! Every model here implements [`ado_core::Model`] and reads its design and
//! parameter columns by name, so grid column order never matters.

mod cra;
mod dd;
mod functions;
mod psi;
mod registry;

pub use cra::{task as cra_task, CraModel, CraUtility, CRA_DESIGNS, CRA_PARAMS};
pub use dd::{task as dd_task, DdModel, Discounting, DD_DESIGNS};
pub use functions::{gumbel_l_cdf, inv_logit, normal_cdf};
pub use psi::{task as psi_task, PsiLink, PsiModel, PSI_PARAMS};
pub use registry::{model_by_name, task_by_name, MODEL_NAMES};
