//! Charts module - chart kinds, request resolution, figure building and rendering

mod figure;
mod kind;
mod layout;
mod palette;
mod plotter;
mod renderer;
mod request;
mod resolver;
mod slots;

pub use figure::{Figure, FigureBody, FigureBuilder};
pub use kind::{ChartKind, Projection};
pub use plotter::ChartPlotter;
pub use renderer::StaticChartRenderer;
pub use request::ChartRequest;
pub use resolver::ChartResolver;
pub use slots::{Cardinality, ColumnOrder, SlotSpec};
