use crossbeam::channel::Sender;
use dashmap::DashMap;
use rouille::{Request, Response};
use url::Url;

use crate::messages::{FrameDataSnapshot, Side, WorkerMessage};

/// Serves the control-plane endpoints: frame-data pulls and the shutdown
/// request.
pub fn handle_request(
	req: &Request, snapshots: &DashMap<Side, FrameDataSnapshot>, tx: &Sender<WorkerMessage>,
) -> Response {
	let url = match Url::parse(&format!("http://127.0.0.1{}", req.raw_url())) {
		Ok(x) => x,
		Err(_) => return Response::empty_400(),
	};

	match url.path() {
		"/frame-data" => {
			let side = url
				.query_pairs()
				.find(|(key, _)| key == "side")
				.and_then(|(_, value)| Side::from_letter(&value));
			match side {
				Some(side) => match snapshots.get(&side) {
					// A deep copy; the worker keeps mutating its own buffers.
					Some(snapshot) => Response::json(&snapshot.clone()),
					None => Response::empty_404(),
				},
				None => Response::empty_400(),
			}
		},
		"/shutdown" => {
			let _ = tx.send(WorkerMessage::Shutdown);
			Response::text("shutting down")
		},
		_ => Response::empty_404(),
	}
}
