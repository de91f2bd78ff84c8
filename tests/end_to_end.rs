//! Coordinator and sensors exchanging frames over mock links.

use std::time::{Duration, Instant};

use sensorgrid::link::mock::Destination;
use sensorgrid::{
    Coordinator, CoordinatorConfig, CounterSource, LinkAddress, MockLink, RxHandler, Sampler,
    SensorConfig, SensorNode, State,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn coordinator_addr() -> LinkAddress {
    LinkAddress::from_bytes(&[0x24, 0x6F, 0x28, 0xAA, 0x00, 0x00])
}

fn sensor_addr(id: u8) -> LinkAddress {
    LinkAddress::from_bytes(&[0x24, 0x6F, 0x28, 0xBB, 0x00, id])
}

struct Sensor {
    node: SensorNode<MockLink>,
    link: MockLink,
    sampler: Sampler,
    online: bool,
}

struct Grid {
    coordinator: Coordinator<MockLink>,
    rx: RxHandler,
    link: MockLink,
    sensors: Vec<Sensor>,
    start: Instant,
}

impl Grid {
    fn new(config: CoordinatorConfig, ids: &[u8]) -> Self {
        let link = MockLink::new();
        let (coordinator, rx) = Coordinator::new(config, link.clone()).unwrap();
        let sensors = ids
            .iter()
            .map(|&id| {
                let link = MockLink::new();
                let node = SensorNode::new(SensorConfig::new(id), link.clone()).unwrap();
                let sampler = node.sampler(CounterSource::new(id));
                Sensor {
                    node,
                    link,
                    sampler,
                    online: true,
                }
            })
            .collect();
        Self {
            coordinator,
            rx,
            link,
            sensors,
            start: Instant::now(),
        }
    }

    fn sensor_mut(&mut self, id: u8) -> &mut Sensor {
        self.sensors
            .iter_mut()
            .find(|s| s.node.device_id() == id)
            .unwrap()
    }

    /// Runs one millisecond of simulated time.
    fn step(&mut self, ms: u64) {
        let now = self.start + Duration::from_millis(ms);

        for sensor in &mut self.sensors {
            sensor.sampler.update(now);
        }

        self.coordinator.tick(now);

        for sent in self.link.take_sent() {
            for sensor in self.sensors.iter_mut().filter(|s| s.online) {
                let addressed = match &sent.dest {
                    Destination::Broadcast => true,
                    Destination::Unicast(to) => *to == sensor_addr(sensor.node.device_id()),
                };
                if addressed {
                    sensor.node.on_receive(&coordinator_addr(), &sent.frame);
                }
            }
        }

        for sensor in &self.sensors {
            let source = sensor_addr(sensor.node.device_id());
            for sent in sensor.link.take_sent() {
                assert_eq!(sent.dest, Destination::Unicast(coordinator_addr()));
                self.rx.on_receive(&source, &sent.frame);
            }
        }
    }

    fn run(&mut self, from_ms: u64, to_ms: u64) {
        for ms in from_ms..to_ms {
            self.step(ms);
        }
    }
}

#[test]
fn test_grid_collects_from_every_sensor() {
    init_tracing();
    let mut grid = Grid::new(CoordinatorConfig::new(3), &[1, 2, 3]);

    grid.run(0, 100);
    assert_ne!(grid.coordinator.state(), State::Discovering);
    assert_eq!(grid.coordinator.registry().registered_count(), 3);

    let now = grid.start + Duration::from_millis(100);
    for view in grid.coordinator.summary(now).iter().take(3) {
        assert!(view.seen, "device {} not seen", view.id);
        assert_eq!(view.measurement_count, 50);
        // first sample of device n starts at 10 * n
        assert_eq!(view.value % 1024, (10 * u16::from(view.id)) % 1024);
    }
    assert!(!grid.coordinator.indicator_on());
}

#[test]
fn test_silent_sensor_is_evicted_and_rejoins() {
    init_tracing();
    let config = CoordinatorConfig::new(2).max_poll_retries(1);
    let mut grid = Grid::new(config, &[1, 2]);

    grid.run(0, 50);
    assert_eq!(grid.coordinator.registry().registered_count(), 2);

    grid.sensor_mut(2).online = false;
    grid.run(50, 700);
    assert_eq!(grid.coordinator.registry().registered_ids(), &[1]);
    assert!(grid.coordinator.any_missing());

    let device = grid.coordinator.registry().get(2).unwrap();
    assert!(!device.is_registered());
    assert!(!device.is_seen());
    assert!(device.last_seen_at().is_some());

    grid.sensor_mut(2).online = true;
    grid.run(700, 2000);
    assert_eq!(grid.coordinator.registry().registered_ids(), &[1, 2]);
    assert!(grid.coordinator.registry().get(2).unwrap().is_seen());
    assert!(grid.link.is_admitted(&sensor_addr(2)));
}
