//! Transport Tests
//!
//! ## Test Scopes
//! - **LocalBus**: Fan-out to every endpoint including the sender, disconnects.
//! - **UdpTransport**: Self-echo and peer delivery over loopback sockets.

#[cfg(test)]
mod tests {
    use crate::message::types::{ServiceId, ServiceMessage};
    use crate::transport::Dispatcher;
    use crate::transport::memory::LocalBus;
    use crate::transport::udp::UdpTransport;
    use std::time::Duration;

    fn message(from: &ServiceId) -> ServiceMessage {
        ServiceMessage::new("masterjob", "billing", "WhoIsMaster", from).with_blob(vec![1, 2, 3])
    }

    // ============================================================
    // TEST 1: LocalBus
    // ============================================================

    #[tokio::test]
    async fn test_local_bus_delivers_to_all_endpoints_including_sender() {
        // ARRANGE
        let bus = LocalBus::new();
        let alpha = ServiceId::new();
        let beta = ServiceId::new();
        let (alpha_out, mut alpha_in) = bus.connect(&alpha);
        let (_beta_out, mut beta_in) = bus.connect(&beta);

        // ACT
        alpha_out.submit(message(&alpha)).unwrap();

        // ASSERT
        let echoed = alpha_in.try_recv().expect("sender hears its own broadcast");
        let received = beta_in.try_recv().expect("peer receives the broadcast");
        assert!(echoed.is_from(&alpha));
        assert_eq!(received, echoed);
        assert!(alpha_in.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_local_bus_disconnect_stops_delivery() {
        let bus = LocalBus::new();
        let alpha = ServiceId::new();
        let beta = ServiceId::new();
        let (alpha_out, _alpha_in) = bus.connect(&alpha);
        let (_beta_out, mut beta_in) = bus.connect(&beta);

        assert!(bus.disconnect(&beta));
        assert!(!bus.disconnect(&beta));
        alpha_out.submit(message(&alpha)).unwrap();

        assert_eq!(bus.endpoint_count(), 1);
        assert!(beta_in.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_local_bus_prunes_closed_endpoints() {
        let bus = LocalBus::new();
        let alpha = ServiceId::new();
        let (alpha_out, _alpha_in) = bus.connect(&alpha);
        let (_gone_out, gone_in) = bus.connect(&ServiceId::new());
        drop(gone_in);

        alpha_out.submit(message(&alpha)).unwrap();

        assert_eq!(bus.endpoint_count(), 1);
    }

    // ============================================================
    // TEST 2: UdpTransport
    // ============================================================

    #[tokio::test]
    async fn test_udp_transport_hears_its_own_broadcast() {
        // ARRANGE
        let transport = UdpTransport::bind("127.0.0.1:0".parse().unwrap(), vec![])
            .await
            .expect("bind loopback socket");
        let mut inbound = transport.clone().start().unwrap();
        let sender = ServiceId::new();

        // ACT
        transport.submit(message(&sender)).unwrap();

        // ASSERT
        let echoed = tokio::time::timeout(Duration::from_secs(2), inbound.recv())
            .await
            .expect("echo within timeout")
            .expect("channel open");
        assert!(echoed.is_from(&sender));
        assert_eq!(echoed.action_type, "WhoIsMaster");
        assert_eq!(echoed.blob, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_udp_transport_delivers_to_peers() {
        // ARRANGE
        let alpha = UdpTransport::bind("127.0.0.1:0".parse().unwrap(), vec![])
            .await
            .unwrap();
        let beta = UdpTransport::bind("127.0.0.1:0".parse().unwrap(), vec![alpha.local_addr()])
            .await
            .unwrap();
        alpha.add_peer(beta.local_addr());
        let _alpha_in = alpha.clone().start().unwrap();
        let mut beta_in = beta.clone().start().unwrap();

        // ACT
        let sender = ServiceId::new();
        alpha.submit(message(&sender)).unwrap();

        // ASSERT
        let received = tokio::time::timeout(Duration::from_secs(2), beta_in.recv())
            .await
            .expect("peer delivery within timeout")
            .expect("channel open");
        assert!(received.is_from(&sender));
        assert_eq!(alpha.peers(), vec![beta.local_addr()]);
    }

    #[tokio::test]
    async fn test_udp_transport_cannot_start_twice() {
        let transport = UdpTransport::bind("127.0.0.1:0".parse().unwrap(), vec![])
            .await
            .unwrap();

        let _inbound = transport.clone().start().unwrap();

        assert!(transport.clone().start().is_err());
    }

    #[tokio::test]
    async fn test_udp_transport_ignores_itself_as_peer() {
        let transport = UdpTransport::bind("127.0.0.1:0".parse().unwrap(), vec![])
            .await
            .unwrap();

        transport.add_peer(transport.local_addr());

        assert!(transport.peers().is_empty());
    }
}
