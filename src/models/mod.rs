pub mod registration;
pub mod product;
pub mod order;
pub mod lenient;

pub use registration::{
    Registration,
    NewRegistration,
    RegisterRequest,
    RegistrationQuery,
    StatusUpdateRequest,
    STATUS_PENDING,
};
pub use product::{Product, NewProduct, ProductPatch, CreateProductRequest, UpdateProductRequest, seed_catalog};
pub use order::{Order, NewOrder, PlaceOrderRequest, OrderQuery, ORDER_STATUS_PENDING};
