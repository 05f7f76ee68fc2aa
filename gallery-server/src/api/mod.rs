pub mod query;

use crate::models::context::ContextPointer;
use async_graphql::{Context, EmptyMutation, EmptySubscription, Schema};
use async_graphql_rocket::{GraphQLQuery, GraphQLRequest, GraphQLResponse};
use rocket::State;

pub type GallerySchema = Schema<query::Query, EmptyMutation, EmptySubscription>;

pub fn build_schema(context: ContextPointer) -> GallerySchema {
    Schema::build(query::Query::default(), EmptyMutation, EmptySubscription)
        .data(context)
        .finish()
}

pub fn get_context<'a>(context: &'a Context<'_>) -> &'a ContextPointer {
    context.data_unchecked::<ContextPointer>()
}

#[rocket::get("/graphql?<query..>")]
pub async fn graphql_query(schema: &State<GallerySchema>, query: GraphQLQuery) -> GraphQLResponse {
    query.execute(schema.inner()).await
}

#[rocket::post("/graphql", data = "<request>", format = "application/json")]
pub async fn graphql_request(
    schema: &State<GallerySchema>,
    request: GraphQLRequest,
) -> GraphQLResponse {
    request.execute(schema.inner()).await
}
