//! Asset inventory spreadsheet to room records
//!
//! The inventory lists one item per row under a zone column that is only
//! filled on the first row of each zone. Chairs count towards capacity,
//! air conditioners and projectors are tallied, and everything else (chairs
//! included) goes into the furniture list as `Item (n)`.

use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use serde::Serialize;
use std::cmp::Ordering;
use std::iter::Peekable;
use std::path::Path;
use std::str::Chars;
use tracing::{debug, info};

pub const ZONE_HEADER: &str = "Nome da Zona Relacionada";
pub const ITEM_HEADER: &str = "Nome de Item de Biblioteca";
pub const QUANTITY_HEADER: &str = "Quantidade";

const DEFAULT_LIGHTING: &str = "Natural + Led";

/// A worksheet cell reduced to what the conversion needs
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => n.to_string(),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            other => Cell::Text(other.to_string()),
        }
    }
}

/// Item quantity; text uses `.` for thousands and `,` for decimals
pub fn parse_quantity(cell: &Cell) -> f64 {
    match cell {
        Cell::Empty => 0.0,
        Cell::Number(n) if n.is_finite() => *n,
        Cell::Number(_) => 0.0,
        Cell::Text(s) => {
            let normalized: String = s
                .replace('.', "")
                .replacen(',', ".", 1)
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            normalized.parse::<f64>().ok().filter(|n| n.is_finite()).unwrap_or(0.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ItemKind {
    Chair,
    AirConditioning,
    Projector,
    Furniture,
}

fn classify(item: &str) -> ItemKind {
    let name = item.to_lowercase();
    if name.starts_with("cadeira") {
        ItemKind::Chair
    } else if name.contains("ar condicionado") {
        ItemKind::AirConditioning
    } else if name.contains("projetor") {
        ItemKind::Projector
    } else {
        ItemKind::Furniture
    }
}

/// One room of the popup database
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomEntry {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub capacidade: i64,
    pub ar_condicionado: i64,
    pub iluminacao: String,
    pub mobiliario: String,
    pub projetor: i64,
}

#[derive(Default)]
struct RoomTally {
    capacity: i64,
    air_conditioning: i64,
    projectors: i64,
    furniture: Vec<(String, i64)>,
}

impl RoomTally {
    fn add_furniture(&mut self, name: &str, quantity: i64) {
        match self.furniture.iter_mut().find(|(n, _)| n == name) {
            Some((_, total)) => *total += quantity,
            None => self.furniture.push((name.to_string(), quantity)),
        }
    }

    fn into_entry(self, id: String) -> RoomEntry {
        let mobiliario = self
            .furniture
            .iter()
            .map(|(name, total)| format!("{name} ({total})"))
            .collect::<Vec<_>>()
            .join(", ");
        RoomEntry {
            display_name: id.clone(),
            id,
            capacidade: self.capacity,
            ar_condicionado: self.air_conditioning,
            iluminacao: DEFAULT_LIGHTING.to_string(),
            mobiliario,
            projetor: self.projectors,
        }
    }
}

struct Columns {
    zone: usize,
    item: usize,
    quantity: usize,
}

fn find_header(rows: &[Vec<Cell>]) -> Option<(usize, Columns)> {
    rows.iter().enumerate().find_map(|(index, row)| {
        let names: Vec<String> = row.iter().map(Cell::text).collect();
        let column = |header: &str| names.iter().position(|n| n == header);
        Some((
            index,
            Columns {
                zone: column(ZONE_HEADER)?,
                item: column(ITEM_HEADER)?,
                quantity: column(QUANTITY_HEADER)?,
            },
        ))
    })
}

/// Compare ids the way people read them: `Sala 2` before `Sala 10`
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut x, mut y) = (a.chars().peekable(), b.chars().peekable());
    loop {
        match (x.peek().copied(), y.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(c), Some(d)) if c.is_ascii_digit() && d.is_ascii_digit() => {
                let (m, n) = (take_digits(&mut x), take_digits(&mut y));
                let (m, n) = (m.trim_start_matches('0'), n.trim_start_matches('0'));
                let order = m.len().cmp(&n.len()).then_with(|| m.cmp(n));
                if order != Ordering::Equal {
                    return order;
                }
            }
            (Some(c), Some(d)) => {
                let order = c.to_lowercase().cmp(d.to_lowercase());
                if order != Ordering::Equal {
                    return order;
                }
                x.next();
                y.next();
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        digits.push(c);
    }
    digits
}

/// Build the room list from worksheet rows, sorted by id
pub fn build_rooms(rows: &[Vec<Cell>]) -> Result<Vec<RoomEntry>> {
    let Some((header_row, columns)) = find_header(rows) else {
        bail!(
            "Could not locate the header row ({}, {}, {})",
            ZONE_HEADER,
            ITEM_HEADER,
            QUANTITY_HEADER
        );
    };

    let mut rooms: Vec<(String, RoomTally)> = Vec::new();
    let mut zone = String::new();

    for row in &rows[header_row + 1..] {
        let cell = |index: usize| row.get(index).cloned().unwrap_or(Cell::Empty);
        let raw_zone = cell(columns.zone).text();
        let item = cell(columns.item).text();
        let quantity = parse_quantity(&cell(columns.quantity)).round() as i64;

        if !raw_zone.is_empty() {
            zone = raw_zone;
        }
        if zone.is_empty() || item.is_empty() {
            continue;
        }

        let position = match rooms.iter().position(|(id, _)| *id == zone) {
            Some(position) => position,
            None => {
                rooms.push((zone.clone(), RoomTally::default()));
                rooms.len() - 1
            }
        };
        if quantity <= 0 {
            debug!(zone = %zone, item = %item, "Skipping item without quantity");
            continue;
        }

        let room = &mut rooms[position].1;
        match classify(&item) {
            ItemKind::Chair => {
                room.capacity += quantity;
                room.add_furniture(&item, quantity);
            }
            ItemKind::AirConditioning => room.air_conditioning += quantity,
            ItemKind::Projector => room.projectors += quantity,
            ItemKind::Furniture => room.add_furniture(&item, quantity),
        }
    }

    let mut entries: Vec<RoomEntry> = rooms
        .into_iter()
        .map(|(id, tally)| tally.into_entry(id))
        .collect();
    entries.sort_by(|a, b| natural_cmp(&a.id, &b.id).then_with(|| a.id.cmp(&b.id)));
    Ok(entries)
}

/// Rows of the first worksheet
pub fn read_rows(path: &Path) -> Result<Vec<Vec<Cell>>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let Some(sheet) = workbook.sheet_names().first().cloned() else {
        bail!("Workbook does not contain any sheets");
    };
    let range = workbook
        .worksheet_range(&sheet)
        .with_context(|| format!("Failed to read sheet {sheet}"))?;
    debug!(sheet = %sheet, rows = range.height(), "Read worksheet");

    Ok(range
        .rows()
        .map(|row| row.iter().map(Cell::from).collect())
        .collect())
}

/// Read a spreadsheet and build its room list
pub fn convert(path: &Path) -> Result<Vec<RoomEntry>> {
    let rooms = build_rooms(&read_rows(path)?)?;
    info!(rooms = rooms.len(), input = %path.display(), "Converted inventory");
    Ok(rooms)
}
