//! Wire envelope shared by weft callers and dispatchers.
//!
//! Every remote call travels as a [`WireRequest`] carrying the HTTP-like
//! [`Verb`], the fully prefixed route and the positional argument list. The
//! dispatcher answers with a [`WireResponse`], which is either a success body
//! or a [`WireFailure`] naming an error tag and a message:
//!
//! ```json
//! {"verb":"POST","route":"/rpc/get_address_list","body":[null,"FN"]}
//! {"status":"success","body":[]}
//! {"status":"failure","body":{"errorTag":"ServiceException","message":"denied"}}
//! ```
//!
//! Both envelopes are serialised as single JSON lines so the same types can be
//! reused by any host that frames one request per message.

mod error;
mod request;
mod response;
pub mod tags;
mod verb;

pub use error::WireError;
pub use request::WireRequest;
pub use response::{WireFailure, WireResponse};
pub use verb::Verb;

/// Re-exported JSON value type used for encoded arguments and results.
pub use serde_json::Value as WireValue;
