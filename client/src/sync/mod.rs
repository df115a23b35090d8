pub mod reconciler;

pub use reconciler::{CollectionWatch, Reconciler};
