pub mod form;
pub mod product;
pub mod support;

pub use form::ProductFormAction;
pub use product::{ProductQuery, ProductQueryAction, NO_PRODUCT_MESSAGE};
pub use support::{
    AskAffirmationAction, AskRephraseAction, DefaultFallbackAction, ResetAction,
    TrainingResponseAction, TRAINING_SLOT,
};
