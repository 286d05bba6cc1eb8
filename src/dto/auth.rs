use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims carried by session tokens from the identity provider.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}
