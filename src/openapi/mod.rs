use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Shopping Cart API",
        version = "1.0.0",
        description = r#"
# Shopping Cart API

Per-user shopping carts: create a cart, add products to it, remove a product
or empty it entirely.

## Authentication

All `/v1` endpoints require HTTP Basic authentication:

```
Authorization: Basic <base64(name:password)>
```

A cart is only visible to the user that created it. Requests for another
user's cart answer `404`, exactly like a cart that does not exist.

## Adding products

Adding a product that is already in the cart increases the stored quantity
and returns the merged line. Deployments may instead be configured to answer
`409 Conflict`.

## Error Handling

Every error uses the same body:

```json
{
  "error": "Not Found",
  "message": "shopping cart not found",
  "request_id": "0d9f6c1e-6a0b-4d59-9a4a-1f3c2b7f5e10",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Shopping Cart", description = "Cart and cart item endpoints"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::carts::create_cart,
        crate::handlers::carts::get_cart,
        crate::handlers::carts::empty_cart,
        crate::handlers::carts::add_product,
        crate::handlers::carts::remove_product,
        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::models::Cart,
            crate::models::CartItem,
            crate::handlers::carts::AddProductRequest,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&BasicAuthAddon)
)]
pub struct ApiDocV1;

/// Registers the `basic` security scheme referenced by the cart paths
struct BasicAuthAddon;

impl Modify for BasicAuthAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "basic",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Basic).build()),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDocV1::openapi())
}
