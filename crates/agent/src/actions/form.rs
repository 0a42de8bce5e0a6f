use async_trait::async_trait;
use dealbot_core::domain::dialog::Turn;
use dealbot_core::errors::ApplicationError;
use dealbot_core::flows::{ProductForm, PRODUCT_FORM};

use crate::context::ActionContext;
use crate::registry::{Action, ActionResponse};

/// Registers the product form under its form name.
#[derive(Default)]
pub struct ProductFormAction {
    form: ProductForm,
}

impl ProductFormAction {
    pub fn new(form: ProductForm) -> Self {
        Self { form }
    }

    pub fn form(&self) -> &ProductForm {
        &self.form
    }
}

#[async_trait]
impl Action for ProductFormAction {
    fn name(&self) -> &'static str {
        PRODUCT_FORM
    }

    async fn run(
        &self,
        turn: &Turn,
        ctx: &ActionContext,
        correlation_id: &str,
    ) -> Result<ActionResponse, ApplicationError> {
        let outcome = self.form.run(turn, &ctx.form_deps(correlation_id))?;
        let resolved = outcome.resolution.as_ref().is_some_and(|res| res.matched().is_some());
        Ok(ActionResponse {
            events: outcome.events,
            responses: outcome.responses,
            retry_after_form: false,
            resolved,
        })
    }
}
