//! Schema-adaptive query core for the restaurant explorer: field resolution,
//! the query catalog, pipeline construction and result shaping.

pub mod analytics;
pub mod builder;
pub mod catalog;
pub mod errors;
pub mod model;
pub mod params;
pub mod query;
pub mod resolver;
pub mod shaper;
pub mod util;

pub use analytics::{build_panel, panels, shape_panel, Panel, PanelDescriptor};
pub use builder::build;
pub use catalog::{catalog, descriptor, menu, unavailable, QueryDescriptor, QueryId};
pub use errors::*;
pub use model::*;
pub use params::{ParamName, ParamSpec, Params, RawParams};
pub use query::*;
pub use resolver::{resolve, Diagnostic, Resolution};
pub use shaper::{shape, Metric, QueryOutput, ResultTable, EMPTY_NOTICE};
