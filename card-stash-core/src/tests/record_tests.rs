use super::*;

const PLACEHOLDER: &str = "images/small/_placeholder.jpg";

fn parse(text: &str) -> Record {
    Record::from_json(
        RecordName::new("pikachu"),
        PathBuf::from("data/pikachu.json"),
        text,
    )
    .unwrap()
}

const PIKACHU: &str = r#"{
  "data": [
    {
      "id": "base1-58",
      "name": "Pikachu",
      "hp": "40",
      "images": {
        "small": "https://images.example.com/base1/58.png",
        "large": "https://images.example.com/base1/58_hires.png"
      },
      "cardmarket": { "url": "https://www.cardmarket.com/en/Pokemon/Products/Singles/Base-Set/Pikachu" }
    },
    {
      "id": "xy/12",
      "images": { "small": "images/small/xy-12_small.png" }
    },
    {
      "name": "Pikachu V",
      "images": { "small": "" },
      "cardmarket": { "url": "https://www.cardmarket.com/en/Pokemon/Products/Singles/Vivid-Voltage/Pikachu-V" }
    },
    { "id": "promo-1", "images": { "small": "images/small/_placeholder.jpg" } },
    { "id": "no-images" }
  ],
  "page": 1
}"#;

#[test]
fn record_name_is_case_insensitive() {
    assert_eq!(RecordName::new("Pikachu"), RecordName::new("pikachu"));
    assert_eq!(
        RecordName::from_path(Path::new("data/MrMime.json")).unwrap().as_str(),
        "mrmime"
    );
}

#[test]
fn assets_classify_reference_state() {
    let record = parse(PIKACHU);
    let assets = record.assets(PLACEHOLDER);
    assert_eq!(assets.len(), 4, "card without images or page is ignored");

    assert_eq!(assets[0].state, AssetState::Remote);
    assert_eq!(
        assets[0].source.as_deref(),
        Some("https://images.example.com/base1/58.png")
    );
    assert_eq!(assets[0].id, "base1-58");
    assert!(assets[0].page_url.is_some());

    assert_eq!(
        assets[1].state,
        AssetState::LocalPath("images/small/xy-12_small.png".into())
    );
    assert_eq!(assets[1].id, "xy-12");
    assert_eq!(assets[1].source, None);

    assert_eq!(assets[2].state, AssetState::Remote);
    assert_eq!(assets[2].source, None);
    assert_eq!(assets[2].id, "Pikachu_V");

    assert_eq!(assets[3].state, AssetState::Placeholder);
}

#[test]
fn asset_id_falls_back_to_record_and_index() {
    let record = parse(r#"{"data": [{"images": {"small": "https://x.example/a.png"}}]}"#);
    let asset = record.asset(0, PLACEHOLDER).unwrap();
    assert_eq!(asset.id, "card_pikachu_0");
}

#[test]
fn set_image_mirrors_large_and_keeps_origin() {
    let mut record = parse(PIKACHU);
    assert!(!record.is_dirty());

    let changed = record.set_image(
        0,
        "images/small/base1-58_small.png",
        Some("https://images.example.com/base1/58.png"),
    );
    assert!(changed);
    assert!(record.is_dirty());

    let images = record.cards()[0].images.as_ref().unwrap();
    assert_eq!(images.small.as_deref(), Some("images/small/base1-58_small.png"));
    assert_eq!(images.large, images.small);
    assert_eq!(
        images.origin.as_deref(),
        Some("https://images.example.com/base1/58.png")
    );

    // The origin survives as the source once the small reference is local.
    let asset = record.asset(0, PLACEHOLDER).unwrap();
    assert_eq!(
        asset.state,
        AssetState::LocalPath("images/small/base1-58_small.png".into())
    );
    assert_eq!(
        asset.source.as_deref(),
        Some("https://images.example.com/base1/58.png")
    );
}

#[test]
fn set_image_without_large_does_not_add_one() {
    let mut record = parse(PIKACHU);
    record.set_image(2, PLACEHOLDER, None);
    let images = record.cards()[2].images.as_ref().unwrap();
    assert_eq!(images.small.as_deref(), Some(PLACEHOLDER));
    assert_eq!(images.large, None);
    assert_eq!(images.origin, None);
}

#[test]
fn identical_reference_is_not_a_change() {
    let mut record = parse(PIKACHU);
    assert!(!record.set_image(1, "images/small/xy-12_small.png", None));
    assert!(!record.is_dirty());
}

#[test]
fn unknown_fields_survive_a_round_trip() {
    let record = parse(PIKACHU);
    let value = record.to_value().unwrap();
    assert_eq!(value["page"], 1);
    assert_eq!(value["data"][0]["hp"], "40");
    assert_eq!(
        value["data"][0]["cardmarket"]["url"],
        "https://www.cardmarket.com/en/Pokemon/Products/Singles/Base-Set/Pikachu"
    );
}

#[test]
fn bare_and_single_layouts_are_preserved() {
    let bare = parse(r#"[{"id": "a", "images": {"small": "https://x.example/a.png"}}]"#);
    assert!(bare.to_value().unwrap().is_array());

    let single = parse(r#"{"data": {"id": "a", "images": {"small": "https://x.example/a.png"}}}"#);
    assert_eq!(single.cards().len(), 1);
    assert!(single.to_value().unwrap()["data"].is_object());
}

#[test]
fn rejects_unexpected_shapes() {
    let name = RecordName::new("x");
    let path = PathBuf::from("x.json");
    assert!(matches!(
        Record::from_json(name.clone(), path.clone(), r#"{"cards": []}"#),
        Err(DocumentError::Shape(_))
    ));
    assert!(matches!(
        Record::from_json(name.clone(), path.clone(), r#""pikachu""#),
        Err(DocumentError::Shape(_))
    ));
    assert!(matches!(
        Record::from_json(name, path, "{not json"),
        Err(DocumentError::Json(_))
    ));
}
