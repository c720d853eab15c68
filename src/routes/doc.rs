use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::cart::{CartItemRequest, CartList, SetQuantityRequest},
    models::{Book, Cart, CartLine},
    pricing::PricingSummary,
    response::{ApiResponse, ErrorData, Meta},
    routes::{cart, health},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        cart::my_cart,
        cart::add_one,
        cart::remove_one,
        cart::clear_item,
        cart::set_quantity,
        cart::list_carts,
        cart::cart_of_owner
    ),
    components(
        schemas(
            Book,
            Cart,
            CartLine,
            CartList,
            CartItemRequest,
            SetQuantityRequest,
            PricingSummary,
            ErrorData,
            Meta,
            ApiResponse<Cart>,
            ApiResponse<CartList>,
            ApiResponse<ErrorData>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Cart", description = "Owner-scoped cart endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
