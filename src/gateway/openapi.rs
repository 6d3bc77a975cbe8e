//! OpenAPI / Swagger UI documentation for the three HTTP surfaces.
//!
//! - Swagger UI: `http://localhost:8080/docs`

use utoipa::OpenApi;

use crate::cashier::CloseOutResult;
use crate::customer::{ApiConfig, CustomerInfo, PayoutInfo};
use crate::order::{CompletedOrder, Order, OrderType};
use crate::product::Product;
use crate::till::TerminalConfig;
use crate::user::{CurrentUser, Role};

#[derive(OpenApi)]
#[openapi(
    components(schemas(
        CompletedOrder,
        Order,
        OrderType,
        Product,
        TerminalConfig,
        CurrentUser,
        Role,
        CloseOutResult,
        CustomerInfo,
        PayoutInfo,
        ApiConfig,
    )),
    tags(
        (name = "admin", description = "Administration surface"),
        (name = "terminal", description = "Point-of-sale terminal surface"),
        (name = "customer", description = "Customer portal surface"),
    )
)]
pub struct ApiDoc;
