pub mod password;
pub use password::PasswordHasher;

pub mod tokens;
pub use tokens::{Claims, TokenError, TokenIssuer, TokenKind, TokenPair};

pub mod upload;
pub use upload::{ImageUpload, UploadError, UploadStore};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, SignupInput};
pub use auth_service_impl::SeaOrmAuthService;

pub mod user_service;
pub mod user_service_impl;
pub use user_service::{UpdateUser, UserError, UserInfo, UserService};
pub use user_service_impl::SeaOrmUserService;

pub mod category_service;
pub mod category_service_impl;
pub use category_service::{
    CategoryError, CategoryInfo, CategoryService, CreateCategory, UpdateCategory,
};
pub use category_service_impl::SeaOrmCategoryService;
