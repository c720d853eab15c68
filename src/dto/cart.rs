use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Cart, ProductId};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartItemRequest {
    pub product_id: ProductId,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetQuantityRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct CartList {
    #[schema(value_type = Vec<Cart>)]
    pub items: Vec<Cart>,
}
