use bytes::BytesMut;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use room_intercept::core::codec::FrameCodec;
use room_intercept::core::frame::RawFrame;
use room_intercept::game::{Posture, RoomTracker, Tile};
use room_intercept::protocol::message::encode;
use room_intercept::protocol::messages::{AvatarStatusMsg, AvatarStatusUpdate, LookToMsg};
use room_intercept::protocol::{ClientType, DialectRegistry, Direction, Interceptor, Message, Session};
use tokio_util::codec::{Decoder, Encoder};

const CLIENT: ClientType = ClientType::Flash;

#[allow(clippy::unwrap_used)]
fn frame_of<M: Message>(interceptor: &Interceptor, msg: &M) -> RawFrame {
    let opcode = interceptor.registry().resolve(msg.identifier(), CLIENT).unwrap();
    RawFrame::new(opcode, encode(msg, CLIENT).unwrap())
}

#[allow(clippy::unwrap_used)]
fn bench_frame_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_codec");
    let payload_sizes = [16usize, 256, 4096, 65536];

    for &size in &payload_sizes {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("encode_{size}b"), |b| {
            b.iter_batched(
                || RawFrame::new(1000, vec![0u8; size]),
                |frame| {
                    let mut buf = BytesMut::with_capacity(size + 8);
                    FrameCodec::default().encode(frame, &mut buf).unwrap();
                },
                BatchSize::SmallInput,
            )
        });
        group.bench_function(format!("decode_{size}b"), |b| {
            let mut wire = BytesMut::new();
            FrameCodec::default()
                .encode(RawFrame::new(1000, vec![0u8; size]), &mut wire)
                .unwrap();
            b.iter_batched(
                || wire.clone(),
                |mut buf| {
                    let frame = FrameCodec::default().decode(&mut buf).unwrap();
                    assert!(frame.is_some());
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    let interceptor = Interceptor::new(DialectRegistry::builtin());
    let _relay = interceptor.attach(Session::new(CLIENT, "bench"));

    let look = frame_of(&interceptor, &LookToMsg { x: 3, y: 4 });
    group.bench_function("unhandled_frame", |b| {
        b.iter(|| interceptor.dispatch(Direction::Outgoing, look.clone()))
    });

    let _subs: Vec<_> = (0..8)
        .map(|_| interceptor.intercept_message::<LookToMsg, _>(|_, _| {}))
        .collect();
    group.bench_function("eight_typed_handlers", |b| {
        b.iter(|| interceptor.dispatch(Direction::Outgoing, look.clone()))
    });

    let _tracker = RoomTracker::new(&interceptor);
    let status = frame_of(
        &interceptor,
        &AvatarStatusMsg {
            updates: (0..25)
                .map(|index| AvatarStatusUpdate {
                    index,
                    location: Tile::new(index, index, 0.0),
                    head_direction: 2,
                    direction: 2,
                    posture: Posture::Sit { height: 1.0 },
                    moving_to: Some(Tile::new(index + 1, index, 0.0)),
                    sign: None,
                    extra: Vec::new(),
                })
                .collect(),
        },
    );
    group.bench_function("tracked_status_25_avatars", |b| {
        b.iter(|| interceptor.dispatch(Direction::Incoming, status.clone()))
    });

    group.finish();
}

criterion_group!(benches, bench_frame_codec, bench_dispatch);
criterion_main!(benches);
