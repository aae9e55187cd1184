//! Tourney Console - live batch input and table synchronization.
//!
//! The console side of the tournament tracker. It drives the pure
//! [`tourney_engine`] against the server:
//!
//! - [`BatchForm`] validates a multi-line buffer and submits the valid lines
//!   as one request
//! - [`TableView`] shows a live table, applies cell edits optimistically and
//!   rolls them back when the server disagrees
//! - [`LiveChannel`] keeps one push connection per topic and reconnects after
//!   a fixed delay
//!
//! # Quick Start
//!
//! ```no_run
//! use tourney_console::{Api, BatchForm, StaticSession};
//! use tourney_engine::{RoundNumber, Transcript};
//!
//! # async fn run() -> tourney_console::Result<()> {
//! let api = Api::http("http://localhost:8000");
//! let session = StaticSession::admin();
//! let mut transcript = Transcript::default();
//!
//! let mut form = BatchForm::match_results(RoundNumber::new(1)?);
//! form.set_text("Lions Tigers 2 3\nBears Wolves 1 1");
//! let report = form.submit(&api, &session, &mut transcript).await?;
//! assert!(report.sent());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod channel;
pub mod config;
pub mod error;
pub mod form;
pub mod session;
pub mod transport;
pub mod view;

pub use api::Api;
pub use channel::{ChannelUpdate, ConnectionState, Connector, LiveChannel, WsConnector};
pub use config::{Config, ConfigError};
pub use error::{ConsoleError, Result};
pub use form::{BatchForm, SubmitReport};
pub use session::{Role, Session, StaticSession};
pub use transport::{ApiRequest, HttpTransport, Method, Transport};
pub use view::{TableView, ViewConfig, ViewEvent};
