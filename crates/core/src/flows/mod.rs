pub mod engine;
pub mod form;
pub mod states;

pub use engine::{
    transition_product_form, FlowDefinition, FlowEngine, FlowTransitionError, ProductFormFlow,
};
pub use form::{
    FormDeps, FormOutcome, FormRejection, FormSpec, ProductForm, SlotMapping, SlotRequest,
    ACTION_LISTEN, DEAD_END_MESSAGE, PRODUCT_FORM,
};
pub use states::{FormAction, FormContext, FormEvent, FormState, TransitionOutcome};
