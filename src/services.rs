pub mod ledger;
pub mod notification_service;
pub mod order_service;
pub mod settlement_service;
pub mod status_service;
