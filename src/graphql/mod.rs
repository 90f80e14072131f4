use async_graphql::{Context, EmptySubscription, ErrorExtensions, Result, Schema};

use crate::error::NausError;
use crate::graphql::mutation::MutationRoot;
use crate::graphql::query::QueryRoot;
use crate::models::admin::Admin;
use crate::models::credential::CurrentMember;
use crate::state::AppState;

pub mod guards;
pub mod mutation;
pub mod query;

pub const SUCCESS_MESSAGE: &'static str = "success";

pub type NausSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(state: AppState) -> NausSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(state)
        .finish()
}

pub(crate) fn app_state<'c>(ctx: &Context<'c>) -> &'c AppState {
    ctx.data_unchecked::<AppState>()
}

pub(crate) fn current_member<'c>(ctx: &Context<'c>) -> Result<&'c CurrentMember> {
    ctx.data_opt::<CurrentMember>()
        .ok_or_else(|| NausError::Unauthorized("User must be logged in".to_owned()).extend())
}

pub(crate) fn current_admin<'c>(ctx: &Context<'c>) -> Result<&'c Admin> {
    ctx.data_opt::<Admin>()
        .ok_or_else(|| NausError::Unauthorized("Admin must be logged in".to_owned()).extend())
}
