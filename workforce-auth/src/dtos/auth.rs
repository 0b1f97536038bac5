use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MagicLinkRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MagicLinkRequestResponse {
    #[schema(example = "If that address belongs to an account, a sign-in link is on its way.")]
    pub message: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyMagicLinkRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    #[schema(example = "Xk3p9QzL0aB7...")]
    pub token: String,
}
