pub mod crew_view;

pub use crew_view::{CrewLeadView, CrewStop};
