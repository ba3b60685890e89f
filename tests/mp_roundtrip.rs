//! Multi-process round trip: two peers connect over a local NATS server,
//! peer 0 hosts a producer, peer 1 hosts a consumer that fetches the
//! producer's capability across the wire. Requires `nats-server` running on
//! `127.0.0.1:4222`.

use crate::common::{config_of, dummy};
use modelcoupler::orchestrator::{run_multi_process, MpOptions};
use modelcoupler::transport::PeerId;
use std::error::Error;
use std::thread;

pub(crate) fn multi_process_round_trip() -> Result<(), Box<dyn Error>> {
    let run_id = format!("roundtrip-{}", std::process::id());

    // Only the supervisor (peer 0) parses the full configuration; it is
    // responsible for splitting sections across peers (assign_sections).
    let config = config_of(vec![
        dummy("Producer", "x", &[]),
        dummy("Consumer", "y", &["x"]),
    ]);

    let run_id_for_peer0 = run_id.clone();
    let peer0 = thread::spawn(move || {
        run_multi_process(
            Some(&config),
            MpOptions {
                nats_url: "nats://127.0.0.1:4222".to_string(),
                run_id: run_id_for_peer0,
                peer_id: PeerId(0),
                n_peers: 2,
            },
        )
    });

    let peer1 = thread::spawn(move || {
        run_multi_process(
            None,
            MpOptions {
                nats_url: "nats://127.0.0.1:4222".to_string(),
                run_id,
                peer_id: PeerId(1),
                n_peers: 2,
            },
        )
    });

    let report0 = peer0.join().expect("peer 0 thread panicked")?;
    let report1 = peer1.join().expect("peer 1 thread panicked")?;

    assert!(report0.success(), "producer peer failed: {:?}", report0.failed);
    assert!(report1.success(), "consumer peer failed: {:?}", report1.failed);
    Ok(())
}
