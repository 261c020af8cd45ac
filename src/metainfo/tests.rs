use super::*;
use crate::bencode::{decode, encode, raw_dict_value, Value};
use sha1::{Digest, Sha1};

fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

fn position(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
        .unwrap_or_else(|| panic!("{:?} not found", String::from_utf8_lossy(needle)))
}

#[test]
fn test_build_is_deterministic() {
    let data = vec![42u8; 3000];
    let builder = TorrentBuilder::new("same.bin")
        .piece_length(1024)
        .trackers(TrackerList::parse("udp://a\nudp://b"));

    let first = builder.build(&data).unwrap();
    let second = builder.build(&data).unwrap();

    assert_eq!(first.document, second.document);
    assert_eq!(first.info_hash, second.info_hash);
    assert_eq!(first.magnet_uri, second.magnet_uri);
}

#[test]
fn test_info_keys_are_sorted() {
    let torrent = TorrentBuilder::new("a.txt").piece_length(256).build(&[1u8; 1000]).unwrap();
    let info = raw_dict_value(&torrent.document, b"info").unwrap().unwrap();

    let length = position(info, b"6:length");
    let name = position(info, b"4:name");
    let piece_length = position(info, b"12:piece length");
    let pieces = position(info, b"6:pieces");
    assert!(length < name && name < piece_length && piece_length < pieces);

    let root_keys: Vec<Vec<u8>> = decode(&torrent.document)
        .unwrap()
        .into_dict()
        .unwrap()
        .into_keys()
        .map(|k| k.to_vec())
        .collect();
    assert_eq!(root_keys, vec![b"info".to_vec()]);
}

#[test]
fn test_exact_document_bytes() {
    let torrent = TorrentBuilder::new("a.txt")
        .piece_length(4)
        .add_tracker("udp://t1")
        .build(b"abcdef")
        .unwrap();

    let mut expected = Vec::new();
    expected.extend_from_slice(b"d8:announce8:udp://t14:infod6:lengthi6e4:name5:a.txt12:piece lengthi4e6:pieces40:");
    expected.extend_from_slice(&Sha1::digest(b"abcd"));
    expected.extend_from_slice(&Sha1::digest(b"ef"));
    expected.extend_from_slice(b"ee");

    assert_eq!(torrent.document.as_ref(), expected.as_slice());
}

#[test]
fn test_info_hash_is_sha1_of_info_only() {
    let torrent = TorrentBuilder::new("a.txt")
        .piece_length(256)
        .add_tracker("udp://t1")
        .build(&[9u8; 700])
        .unwrap();

    let info = decode(&torrent.document).unwrap().get(b"info").cloned().unwrap();
    let info_encoded = encode(&info).unwrap();

    assert_eq!(torrent.info_hash.to_hex(), sha1_hex(&info_encoded));
    assert_ne!(torrent.info_hash.to_hex(), sha1_hex(&torrent.document));
}

#[test]
fn test_magnet_uri_shape() {
    let torrent = TorrentBuilder::new("a.txt")
        .trackers(TrackerList::from_iter(["udp://t1", "udp://t2"]))
        .build(b"hello world")
        .unwrap();

    let info = raw_dict_value(&torrent.document, b"info").unwrap().unwrap();
    let expected = format!(
        "magnet:?xt=urn:btih:{}&dn=a.txt&tr=udp%3A%2F%2Ft1&tr=udp%3A%2F%2Ft2",
        sha1_hex(info)
    );
    assert_eq!(torrent.magnet_uri, expected);
}

#[test]
fn test_no_trackers() {
    let torrent = TorrentBuilder::new("a.txt").build(b"x").unwrap();
    let root = decode(&torrent.document).unwrap();

    assert!(root.get(b"announce").is_none());
    assert!(root.get(b"announce-list").is_none());
    assert!(!torrent.magnet_uri.contains("&tr="));
}

#[test]
fn test_single_tracker() {
    let torrent = TorrentBuilder::new("a.txt").add_tracker("udp://only").build(b"x").unwrap();
    let root = decode(&torrent.document).unwrap();

    assert_eq!(root.get(b"announce").and_then(Value::as_str), Some("udp://only"));
    assert!(root.get(b"announce-list").is_none());
    assert!(torrent.magnet_uri.ends_with("&tr=udp%3A%2F%2Fonly"));
}

#[test]
fn test_announce_list_has_one_tier_per_tracker() {
    let torrent = TorrentBuilder::new("a.txt")
        .trackers(TrackerList::parse("udp://a, udp://b, udp://a"))
        .build(b"x")
        .unwrap();
    let root = decode(&torrent.document).unwrap();

    assert_eq!(root.get(b"announce").and_then(Value::as_str), Some("udp://a"));
    let tiers: Vec<Vec<&str>> = root
        .get(b"announce-list")
        .and_then(Value::as_list)
        .unwrap()
        .iter()
        .map(|tier| tier.as_list().unwrap().iter().filter_map(Value::as_str).collect())
        .collect();
    assert_eq!(tiers, vec![vec!["udp://a"], vec!["udp://b"], vec!["udp://a"]]);
}

#[test]
fn test_zero_length_source_has_one_empty_piece() {
    let torrent = TorrentBuilder::new("empty").piece_length(1).build(b"").unwrap();
    assert_eq!(torrent.piece_count, 1);
    assert_eq!(torrent.length, 0);

    let metainfo = Metainfo::from_bytes(&torrent.document).unwrap();
    assert_eq!(metainfo.info.pieces.len(), 1);
    assert_eq!(hex::encode(metainfo.info.pieces[0]), sha1_hex(b""));
}

#[test]
fn test_piece_counts() {
    let t = TorrentBuilder::new("x").piece_length(256).build(&[0u8; 1000]).unwrap();
    assert_eq!(t.piece_count, 4);
    let m = Metainfo::from_bytes(&t.document).unwrap();
    assert_eq!(m.info.pieces[3], <[u8; 20]>::from(Sha1::digest([0u8; 232])));

    let t = TorrentBuilder::new("x").piece_length(256).build(&[0u8; 512]).unwrap();
    assert_eq!(t.piece_count, 2);
    let m = Metainfo::from_bytes(&t.document).unwrap();
    assert_eq!(m.info.pieces[0], m.info.pieces[1]);
}

#[test]
fn test_non_ascii_name() {
    let torrent = TorrentBuilder::new("résumé (final).pdf").build(b"pdf").unwrap();
    assert!(torrent.magnet_uri.contains("&dn=r%C3%A9sum%C3%A9%20(final).pdf"));

    let metainfo = Metainfo::from_bytes(&torrent.document).unwrap();
    assert_eq!(metainfo.info.name, "résumé (final).pdf");
}

#[test]
fn test_tracker_list_parse() {
    let list = TrackerList::parse("  udp://a:1/announce \n\n http://b/x,udp://a:1/announce,  ,");
    assert_eq!(
        list.as_slice(),
        ["udp://a:1/announce", "http://b/x", "udp://a:1/announce"]
    );
    assert_eq!(list.primary(), Some("udp://a:1/announce"));
    assert!(TrackerList::parse(" , \n ").is_empty());
}

#[test]
fn test_info_hash_hex_and_serde() {
    let hex = "0123456789abcdef0123456789abcdef01234567";
    let hash: InfoHash = hex.parse().unwrap();
    assert_eq!(hash.to_hex(), hex);
    assert_eq!(InfoHash::from_hex(&hex.to_uppercase()).unwrap(), hash);
    assert!(InfoHash::from_hex("abcd").is_err());
    assert!(InfoHash::from_bytes(&[0u8; 19]).is_err());

    let json = serde_json::to_string(&hash).unwrap();
    assert_eq!(json, format!("\"{hex}\""));
    let back: InfoHash = serde_json::from_str(&json).unwrap();
    assert_eq!(back, hash);
}

#[test]
fn test_magnet_link_parse() {
    let uri = "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567&dn=my+file%21&tr=udp%3A%2F%2Ft1&tr=http://t2/announce&x.pe=1.2.3.4:5";
    let magnet = MagnetLink::parse(uri).unwrap();

    assert_eq!(magnet.info_hash.to_hex(), "0123456789abcdef0123456789abcdef01234567");
    assert_eq!(magnet.display_name.as_deref(), Some("my file!"));
    assert_eq!(magnet.trackers, vec!["udp://t1", "http://t2/announce"]);
}

#[test]
fn test_magnet_link_base32() {
    let hash = InfoHash::new([0x11; 20]);
    let b32 = base32::encode(base32::Alphabet::Rfc4648 { padding: false }, hash.as_bytes());
    assert_eq!(b32.len(), 32);

    let magnet = MagnetLink::parse(&format!("magnet:?xt=urn:btih:{}", b32.to_lowercase())).unwrap();
    assert_eq!(magnet.info_hash, hash);
    assert_eq!(magnet.display_name, None);
}

#[test]
fn test_magnet_link_rejects_garbage() {
    assert!(MagnetLink::parse("http://example.com").is_err());
    assert!(MagnetLink::parse("magnet:?dn=no-hash").is_err());
    assert!(MagnetLink::parse("magnet:?xt=urn:btmh:1220abcd").is_err());
    assert!(MagnetLink::parse("magnet:?xt=urn:btih:abc").is_err());
}

#[test]
fn test_magnet_roundtrip_through_builder() {
    let torrent = TorrentBuilder::new("a b&c.txt")
        .add_tracker("udp://t1:80/announce?x=1&y=2")
        .build(b"payload")
        .unwrap();

    let magnet = MagnetLink::parse(&torrent.magnet_uri).unwrap();
    assert_eq!(magnet.info_hash, torrent.info_hash);
    assert_eq!(magnet.display_name.as_deref(), Some("a b&c.txt"));
    assert_eq!(magnet.trackers, vec!["udp://t1:80/announce?x=1&y=2"]);
    assert_eq!(magnet.to_uri(), torrent.magnet_uri);
}

#[test]
fn test_metainfo_magnet_matches_builder() {
    let torrent = TorrentBuilder::new("a.txt")
        .trackers(TrackerList::parse("udp://t1,udp://t2"))
        .build(b"data")
        .unwrap();
    let metainfo = Metainfo::from_bytes(&torrent.document).unwrap();
    assert_eq!(metainfo.magnet().to_uri(), torrent.magnet_uri);
}

#[test]
fn test_metainfo_rejects_invalid_documents() {
    assert!(matches!(
        Metainfo::from_bytes(b"d8:announce3:urle"),
        Err(MetainfoError::MissingField("info"))
    ));
    assert!(matches!(
        Metainfo::from_bytes(b"d4:infod6:lengthi1e4:name1:a12:piece lengthi0e6:pieces0:ee"),
        Err(MetainfoError::InvalidField("piece length"))
    ));
    assert!(matches!(
        Metainfo::from_bytes(b"d4:infod6:lengthi1e4:name1:a12:piece lengthi4e6:pieces3:abcee"),
        Err(MetainfoError::InvalidField("pieces"))
    ));
    assert!(matches!(
        Metainfo::from_bytes(b"not bencode"),
        Err(MetainfoError::Bencode(_))
    ));
}

#[test]
fn test_metainfo_rejects_huge_piece_count() {
    assert!(matches!(
        Metainfo::from_bytes(
            b"d4:infod6:lengthi9223372036854775807e4:name1:a12:piece lengthi1e6:pieces0:ee"
        ),
        Err(MetainfoError::InvalidField("pieces"))
    ));
    assert!(matches!(
        Metainfo::from_bytes(
            b"d4:infod6:lengthi9223372036854775807e4:name1:a12:piece lengthi1e6:pieces20:aaaaaaaaaaaaaaaaaaaaee"
        ),
        Err(MetainfoError::InvalidField("pieces"))
    ));
}

#[test]
fn test_metainfo_accepts_empty_torrent_without_hashes() {
    let metainfo =
        Metainfo::from_bytes(b"d4:infod6:lengthi0e4:name1:a12:piece lengthi4e6:pieces0:ee").unwrap();
    assert_eq!(metainfo.info.piece_count(), 0);
    assert!(metainfo.verify(b"".as_slice(), 1).unwrap().is_valid());
}

#[test]
fn test_metainfo_hashes_raw_info_bytes() {
    let doc = b"d4:infod6:lengthi0e4:name1:a12:piece lengthi4e6:pieces0:ee";
    let metainfo = Metainfo::from_bytes(doc).unwrap();
    let raw = b"d6:lengthi0e4:name1:a12:piece lengthi4e6:pieces0:e";
    assert_eq!(metainfo.raw_info().as_ref(), raw);
    assert_eq!(metainfo.info_hash.to_hex(), sha1_hex(raw));
}

#[test]
fn test_verify_flags_corrupted_and_missing_pieces() {
    let data: Vec<u8> = (0..1000u32).map(|i| i as u8).collect();
    let torrent = TorrentBuilder::new("v.bin").piece_length(256).build(&data).unwrap();
    let metainfo = Metainfo::from_bytes(&torrent.document).unwrap();

    let ok = metainfo.verify(data.as_slice(), 2).unwrap();
    assert!(ok.is_valid());

    let mut corrupted = data.clone();
    corrupted[300] ^= 0xFF;
    let bad = metainfo.verify(corrupted.as_slice(), 1).unwrap();
    assert_eq!(bad.mismatched, vec![1]);
    assert!(!bad.is_valid());

    let short = metainfo.verify(&data[..600], 1).unwrap();
    assert_eq!(short.mismatched, vec![2, 3]);
    assert_eq!(short.source_length, 600);
}

#[test]
fn test_concurrent_builds_are_independent() {
    let builder = TorrentBuilder::new("shared").piece_length(64);
    let handles: Vec<_> = (0..4u8)
        .map(|i| {
            let builder = builder.clone();
            std::thread::spawn(move || builder.build(&vec![i; 500]).unwrap().info_hash)
        })
        .collect();
    let hashes: Vec<InfoHash> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for (i, hash) in hashes.iter().enumerate() {
        assert_eq!(*hash, builder.build(&vec![i as u8; 500]).unwrap().info_hash);
    }
    assert_ne!(hashes[0], hashes[1]);
}
