pub mod auto_login;

pub use auto_login::{
    AutoLogin, EXCLUDED_ENVIRONMENTS, TESTING_USER_ENV, TestingAutoAuthenticator,
    auto_login_middleware,
};
