//! External collaborator services
//!
//! Stateless call-and-return clients behind narrow traits so intent handlers
//! can be tested without the network.

mod chat;
mod search;
mod weather;

pub use chat::{ChatService, GroqChat};
pub use search::{DuckDuckGoSearch, SearchService};
pub use weather::{OpenWeather, WeatherReport, WeatherService};
