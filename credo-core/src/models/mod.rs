pub mod account;
pub mod requests;

pub use account::{Account, AccountResponse, NewAccount, Role};
pub use requests::{ForgotPasswordInput, ResetPasswordInput, SignInInput, SignUpInput};
