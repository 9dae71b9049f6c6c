pub mod extractors;
pub mod middleware;
pub mod oauth;
pub mod password;
pub mod token;

pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use oauth::{HttpOAuthProvider, OAuthProfile, OAuthProvider, OAuthProviders};
pub use password::PasswordHasher;
pub use token::{Claims, TokenPair, TokenService};
