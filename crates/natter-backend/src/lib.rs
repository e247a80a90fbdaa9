pub mod auth_api_client;
pub mod graphql_chat_store;

pub use auth_api_client::AuthApiClient;
pub use graphql_chat_store::GraphqlChatStore;
