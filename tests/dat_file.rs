use std::io::Cursor;

use datkit::Error;
use datkit::attributes::AttrValue;
use datkit::bits::{self, FieldValue};
use datkit::events::registry::registry;
use datkit::formats::dat::{DatFile, NodeData};
use pretty_assertions::assert_eq;
use serde_json::json;
use test_log::test;

const ATTRS: u32 = 0x18;
const SUBACTIONS: u32 = ATTRS + 0x184;
const SUBACTION_COUNT: u32 = 2;
const ANIM_PREFIX: usize = 0x10;

/// Assemble a `.dat` file: header, data block, relocations, directory and
/// string table. `nodes` are (root offset, name), the last one counted in
/// the second root count.
fn dat_file(data: &[u8], relocs: &[u32], nodes: &[(u32, &str)]) -> Vec<u8> {
    let mut strings = Vec::new();
    let mut dir = Vec::new();
    for (offset, name) in nodes {
        dir.extend_from_slice(&offset.to_be_bytes());
        dir.extend_from_slice(&(strings.len() as u32).to_be_bytes());
        strings.extend_from_slice(name.as_bytes());
        strings.push(0);
    }

    let (roots, roots2) = match nodes.len() {
        0 => (0, 0),
        n => (n as u32 - 1, 1),
    };
    let total = 0x20 + data.len() + relocs.len() * 4 + dir.len() + strings.len();

    let mut file = Vec::new();
    for word in [total as u32, data.len() as u32, relocs.len() as u32, roots, roots2, 0, 0, 0] {
        file.extend_from_slice(&word.to_be_bytes());
    }
    file.extend_from_slice(data);
    for r in relocs {
        file.extend_from_slice(&r.to_be_bytes());
    }
    file.extend_from_slice(&dir);
    file.extend_from_slice(&strings);
    file
}

fn put_u32(buf: &mut [u8], offset: u32, value: u32) {
    let offset = offset as usize;
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

/// Append `bytes` at a 4-byte aligned offset and return that offset.
fn append(buf: &mut Vec<u8>, bytes: &[u8]) -> u32 {
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
    let offset = buf.len() as u32;
    buf.extend_from_slice(bytes);
    offset
}

fn op(command: u8, arg: u32) -> Vec<u8> {
    let mut word = arg.to_be_bytes();
    word[0] |= command;
    word.to_vec()
}

fn jump(command: u8, target: u32) -> Vec<u8> {
    let mut bytes = vec![command, 0, 0, 0];
    bytes.extend_from_slice(&target.to_be_bytes());
    bytes
}

struct Fixture {
    file: Vec<u8>,
    anim: Vec<u8>,
    wait_sub: u32,
    goto_block: u32,
}

fn animation_archive() -> Vec<u8> {
    let mut data = Vec::new();
    for word in [1u32, 0, 30.0f32.to_bits(), 0x14, 0x18] {
        data.extend_from_slice(&word.to_be_bytes());
    }
    data.extend_from_slice(&[0u8; 8]);
    let nested = dat_file(&data, &[], &[(0, "PlyFox5K_Share_ACTION_Wait1_figatree")]);

    let mut anim = vec![0u8; ANIM_PREFIX];
    anim.extend_from_slice(&nested);
    anim
}

fn fighter() -> Fixture {
    let mut data = vec![0u8; (SUBACTIONS + SUBACTION_COUNT * 0x18) as usize];
    for (i, word) in [ATTRS, SUBACTIONS, 0, SUBACTIONS, 0, SUBACTIONS + SUBACTION_COUNT * 0x18]
        .into_iter()
        .enumerate()
    {
        put_u32(&mut data, i as u32 * 4, word);
    }
    put_u32(&mut data, ATTRS + 0x58, 2);
    put_u32(&mut data, ATTRS + 0x88, 98.0f32.to_bits());

    let name = append(&mut data, b"PlyFox5K_Share_ACTION_Wait1_figatree\0");

    let wait_sub = append(&mut data, &[op(0x08, 2), op(0x00, 0)].concat());
    let goto_block = append(
        &mut data,
        &[op(0x40, 0), op(0x18, 0), op(0x08, 1), op(0x00, 0)].concat(),
    );

    let script0 = append(
        &mut data,
        &[
            op(0x04, 10),
            jump(0x1c, wait_sub),
            vec![0x30, 0x12, 0x34, 0x56],
            jump(0x14, goto_block),
            op(0x00, 0),
        ]
        .concat(),
    );
    let script1 = append(
        &mut data,
        &[
            jump(0x1c, wait_sub),
            op(0xF0, 0x00AB_CDEF),
            op(0x68, 1),
            op(0x00, 0),
        ]
        .concat(),
    );

    let anim = animation_archive();
    let anim_size = (anim.len() - ANIM_PREFIX) as u32;

    let sub0 = SUBACTIONS;
    put_u32(&mut data, sub0, name);
    put_u32(&mut data, sub0 + 0x04, ANIM_PREFIX as u32);
    put_u32(&mut data, sub0 + 0x08, anim_size);
    put_u32(&mut data, sub0 + 0x0C, script0);
    put_u32(&mut data, sub0 + 0x10, 0x0001_0017);

    let sub1 = SUBACTIONS + 0x18;
    put_u32(&mut data, sub1 + 0x0C, script1);

    let file = dat_file(&data, &[0x0C], &[(0, "ftDataFox"), (0, "Fox_hurtbox_table")]);

    Fixture {
        file,
        anim,
        wait_sub,
        goto_block,
    }
}

#[test]
fn decodes_fighter_without_animations() {
    let fx = fighter();
    let dat = DatFile::parse(&fx.file, None).unwrap();

    assert_eq!(dat.header.root_count, 1);
    assert_eq!(dat.header.root_count2, 1);
    assert_eq!(dat.relocations, vec![0x0C]);
    assert_eq!(dat.root_nodes.len(), 2);
    assert_eq!(dat.root_nodes[0].name, "ftDataFox");
    assert_eq!(dat.root_nodes[1].name, "Fox_hurtbox_table");
    assert_eq!(dat.root_nodes[1].data, NodeData::Unknown);

    let ft = dat.fighter_data().unwrap();
    assert_eq!(ft.attributes["max_jumps"], AttrValue::Int(2));
    assert_eq!(ft.attributes["weight"], AttrValue::Float(98.0));
    assert_eq!(ft.subactions.len(), 2);

    let wait = &ft.subactions[0];
    assert_eq!(wait.name, "PlyFox5K_Share_ACTION_Wait1_figatree");
    assert_eq!(wait.short_name, "Wait1");
    assert_eq!(wait.position_flags, 0x0001);
    assert_eq!(wait.character_id, 0x0017);
    assert!(wait.animation_file.is_none());
    assert!(ft.get_subaction("Wait1").is_some());

    let names: Vec<_> = wait.events.iter().map(|e| e.name).collect();
    assert_eq!(
        names,
        vec![
            Some("wait_until"),
            Some("subroutine"),
            Some("adjust_hitbox_damage"),
            Some("goto"),
            Some("exit"),
        ]
    );
    assert_eq!(wait.events[2].fields["hitbox_id"], FieldValue::Int(0));
    assert_eq!(wait.events[2].fields["damage"], FieldValue::Int(0x12_3456));

    let unnamed = &ft.subactions[1];
    assert_eq!(unnamed.name, "");
    assert_eq!(unnamed.short_name, "");
    assert_eq!(unnamed.events.len(), 4);
    assert_eq!(unnamed.events[1].command_id, 0xF0);
    assert_eq!(unnamed.events[1].name, None);
    assert_eq!(
        unnamed.events[2].fields["state"],
        FieldValue::Label(1, "invulnerable")
    );
}

#[test]
fn collects_subroutines_across_subactions() {
    let fx = fighter();
    let dat = DatFile::parse(&fx.file, None).unwrap();
    let ft = dat.fighter_data().unwrap();

    assert_eq!(
        ft.subroutines.keys().copied().collect::<Vec<_>>(),
        vec![fx.wait_sub, fx.goto_block]
    );
    let called = &ft.subroutines[&fx.wait_sub];
    assert_eq!(called.call.as_ref().map(Vec::len), Some(2));
    assert!(called.jump.is_none());

    let block = ft.subroutines[&fx.goto_block].jump.as_deref().unwrap();
    assert_eq!(block.len(), 2);
    assert_eq!(block.last().unwrap().name, Some("return"));
}

#[test]
fn parses_companion_animations() {
    let fx = fighter();
    let dat = DatFile::parse(&fx.file, Some(&fx.anim)).unwrap();
    let ft = dat.fighter_data().unwrap();

    let nested = ft.subactions[0].animation_file.as_deref().unwrap();
    let node = &nested.root_nodes[0];
    assert_eq!(node.short_name.as_deref(), Some("Wait1"));
    let NodeData::AnimationTree(tree) = &node.data else {
        panic!("expected an animation tree, got {:?}", node.data);
    };
    assert_eq!(tree.num_frames, 30.0);
    assert_eq!(tree.bone_table_offset, 0x14);
    assert_eq!(tree.anim_data_offset, 0x18);

    // Zero-size animation ranges are not parsed.
    assert!(ft.subactions[1].animation_file.is_none());

    let bytes = ft.subactions[0].animation_bytes(&fx.anim).unwrap();
    assert_eq!(bytes, &fx.anim[ANIM_PREFIX..]);
}

#[test]
fn serializes_document() {
    let fx = fighter();
    let dat = DatFile::parse(&fx.file, Some(&fx.anim)).unwrap();
    let doc = serde_json::to_value(&dat).unwrap();

    let nodes = doc["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0]["name"], "ftDataFox");
    assert_eq!(nodes[0]["rootOffset"], 0);
    assert_eq!(nodes[1]["data"], serde_json::Value::Null);

    let data = &nodes[0]["data"];
    assert_eq!(data["attributes"]["max_jumps"], 2);
    assert_eq!(data["attributes"]["weight"], 98.0);
    assert!(data["attributes"].get("?").is_none());

    let sub = &data["subactions"][0];
    assert_eq!(sub["shortName"], "Wait1");
    assert_eq!(sub["animOffset"], ANIM_PREFIX);
    assert_eq!(sub["eventsOffset"].as_u64().unwrap() % 4, 0);
    assert_eq!(
        sub["events"][2],
        json!({
            "commandId": "0x30",
            "name": "adjust_hitbox_damage",
            "length": 4,
            "bytes": "30 12 34 56",
            "fields": { "hitbox_id": 0, "damage": 0x12_3456 },
        })
    );
    assert_eq!(
        sub["events"][4],
        json!({ "commandId": "0x0", "name": "exit", "length": 4, "bytes": "00 00 00 00" })
    );
    assert_eq!(sub["animationFile"]["nodes"][0]["shortName"], "Wait1");
    assert_eq!(sub["animationFile"]["nodes"][0]["data"]["numFrames"], 30.0);
    assert!(data["subactions"][1].get("animationFile").is_none());

    let subroutines = data["subroutines"].as_object().unwrap();
    assert_eq!(subroutines.len(), 2);
    assert_eq!(
        subroutines[&fx.goto_block.to_string()]["goto"][1]["name"],
        "return"
    );
    let called = &subroutines[&fx.wait_sub.to_string()];
    assert_eq!(called["subroutine"].as_array().unwrap().len(), 2);
    assert!(called.get("goto").is_none());
}

#[test]
fn reads_from_a_stream() {
    let fx = fighter();
    let from_stream = DatFile::read(Cursor::new(&fx.file), None).unwrap();
    assert_eq!(from_stream, DatFile::parse(&fx.file, None).unwrap());
}

#[test]
fn truncated_files_are_rejected() {
    let fx = fighter();
    for len in [0x10, 0x20 + 0x40, fx.file.len() - 40] {
        assert!(
            DatFile::parse(&fx.file[..len], None).is_err(),
            "length {len:#x} decoded"
        );
    }
}

#[test]
fn animation_range_outside_archive_is_fatal() {
    let fx = fighter();
    let short_anim = &fx.anim[..fx.anim.len() - 1];
    assert!(matches!(
        DatFile::parse(&fx.file, Some(short_anim)),
        Err(Error::TruncatedInput)
    ));
}

#[test]
fn decoded_fields_repack_to_raw_bytes() {
    let fx = fighter();
    let dat = DatFile::parse(&fx.file, None).unwrap();
    let ft = dat.fighter_data().unwrap();

    let table = registry();
    for event in ft.subactions.iter().flat_map(|s| &s.events) {
        let meta = table.get(event.command_id);
        let Some(layout) = meta.layout else { continue };
        let values: Vec<_> = event.fields.values().copied().collect();
        let packed = bits::encode(event.command_id, layout.bits, &values, event.length).unwrap();
        assert_eq!(packed, event.bytes, "{:?}", event.name);
    }
}
