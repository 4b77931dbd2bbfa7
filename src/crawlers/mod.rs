pub mod session;
pub mod visit;
pub mod web;
pub mod webdriver;

pub use session::{PageSession, SessionFactory};
pub use visit::{VisitHandler, VisitHook, VisitPage};
pub use web::{Frontier, WebCrawler};
pub use webdriver::{WebDriverFactory, WebDriverSession};
