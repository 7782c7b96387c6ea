/* 📖 # Why a single dispatcher service?

Every API route shares negotiation, error rendering and the store handle, so
one HttpService routes `/api/...` internally. The server adapter in
chain_base only ever sees that one service.
*/

mod dispatcher;

pub use dispatcher::{DispatchState, Dispatched, RequestDispatcher};
