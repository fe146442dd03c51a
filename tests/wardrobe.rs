//! Wardrobe import and outfit changes against an attached session.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{attached, drain, feed, OUT};
use room_intercept::game::Gender;
use room_intercept::protocol::messages::{UpdateAvatarMsg, WardrobeMsg, WardrobeSlot};
use room_intercept::protocol::{ClientType, Out};
use room_intercept::service::wardrobe::outfits_from_text;
use room_intercept::service::{import_wardrobe, wear_outfit, Outfit};
use room_intercept::ProtocolError;
use std::time::Duration;

#[tokio::test]
async fn test_import_wardrobe_on_flash() {
    let (interceptor, mut rx) = attached(ClientType::Flash);

    let importer = interceptor.clone();
    let task = tokio::spawn(async move {
        import_wardrobe(&importer, Duration::from_secs(2)).await
    });

    let request = rx.recv().await.unwrap();
    assert_eq!(request.direction, OUT);
    assert_eq!(
        Some(request.frame.opcode),
        interceptor.registry().resolve(Out::GET_WARDROBE, ClientType::Flash)
    );

    feed(
        &interceptor,
        &WardrobeMsg {
            state: 1,
            slots: vec![
                WardrobeSlot {
                    slot: 1,
                    figure: "hd-180-1.ch-210-66".to_string(),
                    gender: Gender::Male,
                },
                WardrobeSlot {
                    slot: 2,
                    figure: "hd-600-1.lg-715-62".to_string(),
                    gender: Gender::Female,
                },
            ],
        },
    );

    let outfits = task.await.unwrap().unwrap();
    assert_eq!(
        outfits,
        vec![
            Outfit::new("hd-180-1.ch-210-66", Gender::Male, false),
            Outfit::new("hd-600-1.lg-715-62", Gender::Female, false),
        ]
    );
}

#[tokio::test]
async fn test_import_wardrobe_is_unsupported_on_origins() {
    let (interceptor, mut rx) = attached(ClientType::Shockwave);

    let err = import_wardrobe(&interceptor, Duration::from_millis(10))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::UnsupportedVariant {
            client: ClientType::Shockwave,
            ..
        }
    ));
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_wear_outfit_sends_figure_update() {
    let (interceptor, mut rx) = attached(ClientType::Unity);
    let outfit = Outfit::new("hd-180-1.ch-210-66", Gender::Male, false);

    wear_outfit(&interceptor, &outfit).unwrap();

    let sent = drain(&interceptor, &mut rx);
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].parse::<UpdateAvatarMsg>().unwrap(),
        UpdateAvatarMsg {
            gender: Gender::Male,
            figure: "hd-180-1.ch-210-66".to_string(),
        }
    );
}

#[test]
fn test_origins_outfit_only_fits_origins() {
    let figure = "1800115001330012850125001";
    let outfits = outfits_from_text(&format!("try {figure}"), ClientType::Shockwave, Gender::Male);
    assert_eq!(outfits.len(), 1);
    assert!(outfits[0].is_origins);

    let (flash, mut rx) = attached(ClientType::Flash);
    let err = wear_outfit(&flash, &outfits[0]).unwrap_err();
    assert!(matches!(err, ProtocolError::UnsupportedVariant { .. }));
    assert!(rx.try_recv().is_err());

    let (origins, mut rx) = attached(ClientType::Shockwave);
    wear_outfit(&origins, &outfits[0]).unwrap();
    assert_eq!(drain(&origins, &mut rx).len(), 1);
}
