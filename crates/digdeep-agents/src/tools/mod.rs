//! External collaborators used by the research steps
//!
//! - Web search: [`WebSearch`] with Tavily and DuckDuckGo backends
//! - Charts: [`ChartRenderer`] with a PNG implementation
//! - Reflection: [`ReflectionTool`]

pub mod chart;
pub mod duckduckgo;
pub mod search;
pub mod tavily;
pub mod think;

pub use chart::{ChartError, ChartKind, ChartRenderer, ChartRequest, DataPoint, ImageChartRenderer};
pub use duckduckgo::{DuckDuckGoError, DuckDuckGoSearch};
pub use search::{SearchHit, SearchResponse, WebSearch, NO_RESULTS};
pub use tavily::{SearchDepth, TavilyError, TavilySearch, Topic};
pub use think::ReflectionTool;
