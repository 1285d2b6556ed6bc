//! Form handling: CSRF protection and the module formset.

pub mod csrf;
pub mod module_formset;

pub use module_formset::{ModuleFormSet, ModuleRow};
