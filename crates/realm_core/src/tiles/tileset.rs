use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use thiserror::Error;
use tracing::debug;

use super::registry::{DrawableHandle, TileDescriptor, TileProps};
use super::TileId;

/// Upper bound on `tilecount`; one 4096×4096 sheet of 16 px tiles.
pub const MAX_TILESET_TILES: u32 = 65_536;

#[derive(Debug, Error)]
pub enum TilesetError {
    #[error("failed to read tileset {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed tileset XML at line {line}, column {column}: {message}")]
    Malformed {
        line: u32,
        column: u32,
        message: String,
    },
    #[error("invalid tileset at line {line}, column {column}: {message}")]
    Invalid {
        line: u32,
        column: u32,
        message: String,
    },
}

/// A parsed `.tsx` tileset with its tiles already shifted to global ids.
#[derive(Debug, Clone)]
pub struct Tileset {
    pub name: String,
    pub first_gid: TileId,
    pub tile_count: u32,
    pub image: Option<String>,
    pub tiles: Vec<TileDescriptor>,
}

pub fn load_tileset_file(path: &Path, first_gid: TileId) -> Result<Tileset, TilesetError> {
    let raw = fs::read_to_string(path).map_err(|source| TilesetError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_tileset(&raw, first_gid)
}

pub fn parse_tileset(raw: &str, first_gid: TileId) -> Result<Tileset, TilesetError> {
    let doc = Document::parse(raw).map_err(|error| TilesetError::Malformed {
        line: error.pos().row,
        column: error.pos().col,
        message: error.to_string(),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "tileset" {
        return Err(invalid_at(&doc, root, "root element must be <tileset>"));
    }

    let name = root.attribute("name").unwrap_or("tileset").to_string();
    let tile_count = required_u32(&doc, root, "tilecount")?;
    if tile_count > MAX_TILESET_TILES {
        return Err(invalid_at(
            &doc,
            root,
            &format!("tilecount {tile_count} exceeds the limit of {MAX_TILESET_TILES}"),
        ));
    }
    if first_gid.checked_add(tile_count.saturating_sub(1)).is_none() {
        return Err(invalid_at(
            &doc,
            root,
            &format!("firstgid {first_gid} leaves no room for {tile_count} tiles"),
        ));
    }
    let image = root
        .children()
        .find(|child| child.has_tag_name("image"))
        .and_then(|node| node.attribute("source"))
        .map(ToString::to_string);

    let mut overrides = HashMap::<u32, (Option<String>, TileProps)>::new();
    for tile in root.children().filter(|child| child.has_tag_name("tile")) {
        let local_id = required_u32(&doc, tile, "id")?;
        if local_id >= tile_count {
            return Err(invalid_at(
                &doc,
                tile,
                &format!("tile id {local_id} is outside tilecount {tile_count}"),
            ));
        }
        overrides.insert(local_id, parse_tile_props(&doc, tile)?);
    }

    let mut tiles = Vec::with_capacity(tile_count as usize);
    for local_id in 0..tile_count {
        let (custom_name, props) = overrides.remove(&local_id).unwrap_or_default();
        let name = custom_name.unwrap_or_else(|| format!("{name}_{local_id}"));
        let Some(gid) = first_gid.checked_add(local_id) else {
            return Err(invalid_at(&doc, root, "global tile id overflows u32"));
        };
        let mut descriptor = TileDescriptor::new(gid, name, props);
        if let Some(image) = &image {
            descriptor = descriptor.with_drawable(DrawableHandle {
                image: image.clone(),
                index: local_id,
            });
        }
        tiles.push(descriptor);
    }

    debug!(
        tileset = %name,
        first_gid,
        tile_count,
        "tileset_parsed"
    );

    Ok(Tileset {
        name,
        first_gid,
        tile_count,
        image,
        tiles,
    })
}

fn parse_tile_props(
    doc: &Document<'_>,
    tile: Node<'_, '_>,
) -> Result<(Option<String>, TileProps), TilesetError> {
    let mut props = TileProps {
        animated: tile.children().any(|child| child.has_tag_name("animation")),
        ..TileProps::default()
    };
    let mut name = None;

    let properties = tile
        .children()
        .filter(|child| child.has_tag_name("properties"))
        .flat_map(|node| node.children())
        .filter(|child| child.has_tag_name("property"));

    for property in properties {
        let Some(key) = property.attribute("name") else {
            return Err(invalid_at(doc, property, "<property> is missing name"));
        };
        let value = property
            .attribute("value")
            .or_else(|| property.text())
            .unwrap_or_default()
            .trim();
        match key {
            "isWalkable" => props.is_walkable = parse_bool(doc, property, key, value)?,
            "renderAfter" => props.render_after = parse_bool(doc, property, key, value)?,
            "animated" => props.animated = parse_bool(doc, property, key, value)?,
            "damage" => {
                props.damage = value.parse::<f32>().map_err(|_| {
                    invalid_at(doc, property, &format!("damage '{value}' is not a number"))
                })?;
            }
            "name" => name = Some(value.to_string()),
            // Unknown properties belong to other consumers (audio, UI hints).
            _ => {}
        }
    }

    Ok((name, props))
}

fn parse_bool(
    doc: &Document<'_>,
    node: Node<'_, '_>,
    key: &str,
    value: &str,
) -> Result<bool, TilesetError> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(invalid_at(
            doc,
            node,
            &format!("{key} '{value}' is not a boolean"),
        )),
    }
}

fn required_u32(
    doc: &Document<'_>,
    node: Node<'_, '_>,
    attribute: &str,
) -> Result<u32, TilesetError> {
    let raw = node.attribute(attribute).ok_or_else(|| {
        invalid_at(
            doc,
            node,
            &format!("<{}> is missing {attribute}", node.tag_name().name()),
        )
    })?;
    raw.parse::<u32>()
        .map_err(|_| invalid_at(doc, node, &format!("{attribute} '{raw}' is not a u32")))
}

fn invalid_at(doc: &Document<'_>, node: Node<'_, '_>, message: &str) -> TilesetError {
    let pos = doc.text_pos_at(node.range().start);
    TilesetError::Invalid {
        line: pos.row,
        column: pos.col,
        message: message.to_string(),
    }
}
