pub mod confirmation;

pub use confirmation::{
    target_date, Asset, AssetRecord, ConfirmationReport, Route, RouteResult, RouteStatus,
};
