//! PCD (Point Cloud Data) loader
//!
//! Default [`PayloadDecoder`]. Reads PCD v0.7 files in all three storage
//! variants:
//! - `DATA ascii`: one whitespace-separated point per line
//! - `DATA binary`: packed little-endian point records
//! - `DATA binary_compressed`: LZF block, column-major (one field after another)
//!
//! The same file can be decoded as any [`PayloadKind`] whose fields it carries.

use std::path::Path;

use log::debug;

use super::cloud::{PointCloud, PointXyz, PointXyzRgb, PointXyzSift, DEFAULT_VIEWPOINT, SIFT_DESCRIPTOR_LEN};
use super::lzf;
use super::payload::{Payload, PayloadKind};
use super::traits::{DecodeError, PayloadDecoder};

/// Storage variant declared by the `DATA` header line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Ascii,
    Binary,
    BinaryCompressed,
}

/// One entry of the FIELDS/SIZE/TYPE/COUNT header lines
#[derive(Debug, Clone, PartialEq)]
pub struct PcdField {
    pub name: String,
    /// Bytes per element: 1, 2, 4 or 8
    pub size: usize,
    /// 'I' signed, 'U' unsigned, 'F' float
    pub ty: char,
    /// Elements per point
    pub count: usize,
    /// Byte offset inside a binary point record
    pub offset: usize,
    /// Position in the FIELDS line
    pub index: usize,
}

impl PcdField {
    fn bytes(&self) -> usize {
        self.size * self.count
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PcdHeader {
    pub version: Option<String>,
    pub fields: Vec<PcdField>,
    pub width: u32,
    pub height: u32,
    pub viewpoint: [f32; 7],
    pub points: usize,
    pub data: DataFormat,
    /// Bytes per binary point record
    pub point_size: usize,
    /// Offset of the first byte after the DATA line
    pub data_offset: usize,
}

impl PcdHeader {
    /// Parse the header from the start of a PCD file
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut version = None;
        let mut names: Vec<String> = Vec::new();
        let mut sizes: Vec<usize> = Vec::new();
        let mut types: Vec<char> = Vec::new();
        let mut counts: Vec<usize> = Vec::new();
        let mut width: Option<u32> = None;
        let mut height: Option<u32> = None;
        let mut viewpoint = DEFAULT_VIEWPOINT;
        let mut points: Option<usize> = None;

        let mut pos = 0usize;
        loop {
            if pos >= bytes.len() {
                return Err(DecodeError::Header("missing DATA line".into()));
            }
            let end = bytes[pos..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|i| pos + i + 1)
                .unwrap_or(bytes.len());
            let line = std::str::from_utf8(&bytes[pos..end])
                .map_err(|_| DecodeError::Header("header is not valid UTF-8".into()))?
                .trim();
            pos = end;

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let Some(key) = tokens.next() else { continue };
            let values: Vec<&str> = tokens.collect();

            match key.to_ascii_uppercase().as_str() {
                "VERSION" => version = values.first().map(|v| v.to_string()),
                "FIELDS" | "COLUMNS" => names = values.iter().map(|v| v.to_string()).collect(),
                "SIZE" => sizes = parse_list(key, &values)?,
                "TYPE" => {
                    types = values
                        .iter()
                        .map(|v| v.chars().next().map(|c| c.to_ascii_uppercase()).unwrap_or('?'))
                        .collect()
                }
                "COUNT" => counts = parse_list(key, &values)?,
                "WIDTH" => width = Some(parse_one(key, &values)?),
                "HEIGHT" => height = Some(parse_one(key, &values)?),
                "POINTS" => points = Some(parse_one(key, &values)?),
                "VIEWPOINT" => {
                    let vp: Vec<f32> = parse_list(key, &values)?;
                    if vp.len() != 7 {
                        return Err(DecodeError::Header(format!(
                            "VIEWPOINT needs 7 values, got {}",
                            vp.len()
                        )));
                    }
                    viewpoint.copy_from_slice(&vp);
                }
                "DATA" => {
                    let data = match values.first().map(|v| v.to_ascii_lowercase()) {
                        Some(v) if v == "ascii" => DataFormat::Ascii,
                        Some(v) if v == "binary" => DataFormat::Binary,
                        Some(v) if v == "binary_compressed" => DataFormat::BinaryCompressed,
                        other => {
                            return Err(DecodeError::Unsupported(format!(
                                "DATA {}",
                                other.unwrap_or_default()
                            )));
                        }
                    };
                    return Self::assemble(
                        version, names, sizes, types, counts, width, height, viewpoint, points, data, pos,
                    );
                }
                other => debug!("Ignoring unknown PCD header key {}", other),
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        version: Option<String>,
        names: Vec<String>,
        sizes: Vec<usize>,
        types: Vec<char>,
        counts: Vec<usize>,
        width: Option<u32>,
        height: Option<u32>,
        viewpoint: [f32; 7],
        points: Option<usize>,
        data: DataFormat,
        data_offset: usize,
    ) -> Result<Self, DecodeError> {
        if names.is_empty() {
            return Err(DecodeError::Header("no FIELDS".into()));
        }
        if sizes.len() != names.len() || types.len() != names.len() {
            return Err(DecodeError::Header(format!(
                "FIELDS/SIZE/TYPE length mismatch ({}/{}/{})",
                names.len(),
                sizes.len(),
                types.len()
            )));
        }
        let counts = if counts.is_empty() { vec![1; names.len()] } else { counts };
        if counts.len() != names.len() {
            return Err(DecodeError::Header("COUNT length mismatch".into()));
        }

        let mut fields = Vec::with_capacity(names.len());
        let mut offset = 0usize;
        for (index, (((name, size), ty), count)) in names.into_iter().zip(sizes).zip(types).zip(counts).enumerate() {
            if !matches!(size, 1 | 2 | 4 | 8) || !matches!(ty, 'I' | 'U' | 'F') || (ty == 'F' && size < 4) {
                return Err(DecodeError::Header(format!(
                    "field '{}' has unsupported type {}{}",
                    name, ty, size
                )));
            }
            if count == 0 {
                return Err(DecodeError::Header(format!("field '{}' has COUNT 0", name)));
            }
            let field = PcdField { name, size, ty, count, offset, index };
            offset = field
                .size
                .checked_mul(field.count)
                .and_then(|bytes| offset.checked_add(bytes))
                .ok_or_else(|| DecodeError::Header("point record size overflows".into()))?;
            fields.push(field);
        }

        let width = width.ok_or_else(|| DecodeError::Header("no WIDTH".into()))?;
        let height = height.unwrap_or(1);
        let grid = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| DecodeError::Header(format!("WIDTH*HEIGHT {}x{} overflows", width, height)))?;
        let points = points.unwrap_or(grid);
        if points != grid {
            return Err(DecodeError::Header(format!(
                "POINTS {} does not match WIDTH*HEIGHT {}x{}",
                points, width, height
            )));
        }
        if points.checked_mul(offset).is_none() {
            return Err(DecodeError::Header(format!(
                "{} points of {} bytes overflow the addressable size",
                points, offset
            )));
        }

        Ok(Self {
            version,
            fields,
            width,
            height,
            viewpoint,
            points,
            data,
            point_size: offset,
            data_offset,
        })
    }

    /// Bytes of binary point data; cannot overflow once parsed
    pub fn body_len(&self) -> usize {
        self.points * self.point_size
    }

    pub fn field(&self, name: &str) -> Option<&PcdField> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn require(&self, name: &'static str) -> Result<&PcdField, DecodeError> {
        self.field(name).ok_or(DecodeError::MissingField(name))
    }
}

fn parse_one<T: std::str::FromStr>(key: &str, values: &[&str]) -> Result<T, DecodeError> {
    values
        .first()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| DecodeError::Header(format!("bad {} value", key)))
}

fn parse_list<T: std::str::FromStr>(key: &str, values: &[&str]) -> Result<Vec<T>, DecodeError> {
    values
        .iter()
        .map(|v| v.parse().map_err(|_| DecodeError::Header(format!("bad {} value '{}'", key, v))))
        .collect()
}

/// Random access to the body of a parsed file
enum Body<'a> {
    /// Tokens per point line
    Ascii(Vec<Vec<&'a str>>),
    /// Row-major records
    Records(&'a [u8]),
    /// Column-major, decompressed
    Columns(Vec<u8>),
}

struct PointTable<'a> {
    header: &'a PcdHeader,
    body: Body<'a>,
    /// Start of each field's column block (Columns only)
    column_starts: Vec<usize>,
    /// Token index of each field's first element (Ascii only)
    token_starts: Vec<usize>,
}

impl<'a> PointTable<'a> {
    fn new(header: &'a PcdHeader, bytes: &'a [u8]) -> Result<Self, DecodeError> {
        let raw = bytes.get(header.data_offset..).unwrap_or(&[]);
        let total = header.body_len();

        let mut token_starts = Vec::with_capacity(header.fields.len());
        let mut tokens = 0usize;
        for f in &header.fields {
            token_starts.push(tokens);
            tokens += f.count;
        }
        let mut column_starts = Vec::with_capacity(header.fields.len());
        let mut col = 0usize;
        for f in &header.fields {
            column_starts.push(col);
            col += f.bytes() * header.points;
        }

        let body = match header.data {
            DataFormat::Ascii => {
                let text = std::str::from_utf8(raw)
                    .map_err(|_| DecodeError::Parse { point: 0, msg: "body is not valid UTF-8".into() })?;
                let rows: Vec<Vec<&str>> = text
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .take(header.points)
                    .map(|l| l.split_whitespace().collect())
                    .collect();
                if rows.len() < header.points {
                    return Err(DecodeError::Parse {
                        point: rows.len(),
                        msg: format!("expected {} point lines", header.points),
                    });
                }
                if let Some((i, _)) = rows.iter().enumerate().find(|(_, r)| r.len() < tokens) {
                    return Err(DecodeError::Parse {
                        point: i,
                        msg: format!("expected {} values", tokens),
                    });
                }
                Body::Ascii(rows)
            }
            DataFormat::Binary => {
                if raw.len() < total {
                    return Err(DecodeError::Truncated { expected: total, actual: raw.len() });
                }
                Body::Records(&raw[..total])
            }
            DataFormat::BinaryCompressed => {
                if raw.len() < 8 {
                    return Err(DecodeError::Truncated { expected: 8, actual: raw.len() });
                }
                let compressed = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
                let uncompressed = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]) as usize;
                if uncompressed != total {
                    return Err(DecodeError::Header(format!(
                        "compressed block inflates to {} bytes, header implies {}",
                        uncompressed, total
                    )));
                }
                if uncompressed > compressed.saturating_mul(lzf::MAX_EXPANSION) {
                    return Err(DecodeError::Header(format!(
                        "{} compressed bytes cannot inflate to {}",
                        compressed, uncompressed
                    )));
                }
                let block = raw.get(8..8 + compressed).ok_or(DecodeError::Truncated {
                    expected: 8 + compressed,
                    actual: raw.len(),
                })?;
                Body::Columns(lzf::decompress(block, uncompressed)?)
            }
        };

        Ok(Self { header, body, column_starts, token_starts })
    }

    fn raw_bytes(&self, point: usize, field: &PcdField, elem: usize) -> Result<&[u8], DecodeError> {
        let (data, at): (&[u8], usize) = match &self.body {
            Body::Records(data) => (data, point * self.header.point_size + field.offset + elem * field.size),
            Body::Columns(data) => (
                data,
                self.column_starts[field.index] + point * field.bytes() + elem * field.size,
            ),
            Body::Ascii(_) => return Ok(&[]),
        };
        data.get(at..at + field.size).ok_or(DecodeError::Truncated {
            expected: at + field.size,
            actual: data.len(),
        })
    }

    fn token(&self, point: usize, field: &PcdField, elem: usize) -> Option<&str> {
        match &self.body {
            Body::Ascii(rows) => {
                rows[point].get(self.token_starts[field.index] + elem).copied()
            }
            _ => None,
        }
    }

    /// Numeric value of one element, widened to f64
    fn value(&self, point: usize, field: &PcdField, elem: usize) -> Result<f64, DecodeError> {
        if let Body::Ascii(_) = self.body {
            let tok = self.token(point, field, elem).unwrap_or("");
            return parse_ascii_number(tok).ok_or_else(|| DecodeError::Parse {
                point,
                msg: format!("bad value '{}' for field {}", tok, field.name),
            });
        }
        let b = self.raw_bytes(point, field, elem)?;
        Ok(match (field.ty, field.size) {
            ('F', 4) => f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64,
            ('F', 8) => f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]),
            ('I', 1) => b[0] as i8 as f64,
            ('I', 2) => i16::from_le_bytes([b[0], b[1]]) as f64,
            ('I', 4) => i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64,
            ('I', 8) => i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f64,
            ('U', 1) => b[0] as f64,
            ('U', 2) => u16::from_le_bytes([b[0], b[1]]) as f64,
            ('U', 4) => u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64,
            _ => u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f64,
        })
    }

    /// Raw 32-bit pattern of a packed colour field (rgb stored as F4 or U4)
    fn bits32(&self, point: usize, field: &PcdField) -> Result<u32, DecodeError> {
        if field.size != 4 {
            return Err(DecodeError::Unsupported(format!(
                "colour field '{}' must be 4 bytes",
                field.name
            )));
        }
        if let Body::Ascii(_) = self.body {
            let tok = self.token(point, field, 0).unwrap_or("");
            let parsed = if field.ty == 'F' {
                tok.parse::<f32>().ok().map(f32::to_bits)
            } else {
                tok.parse::<u32>().ok()
            };
            return parsed.ok_or_else(|| DecodeError::Parse {
                point,
                msg: format!("bad colour value '{}'", tok),
            });
        }
        let b = self.raw_bytes(point, field, 0)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

fn parse_ascii_number(tok: &str) -> Option<f64> {
    match tok.to_ascii_lowercase().as_str() {
        "nan" | "-nan" => Some(f64::NAN),
        _ => tok.parse::<f64>().ok(),
    }
}

/// PCD file reader
#[derive(Debug, Clone, Copy, Default)]
pub struct PcdLoader;

impl PcdLoader {
    pub fn new() -> Self {
        Self
    }

    /// Read and parse only the header
    pub fn header(path: &Path) -> Result<PcdHeader, DecodeError> {
        let bytes = std::fs::read(path)?;
        PcdHeader::parse(&bytes)
    }

    pub fn load_xyz(path: &Path) -> Result<PointCloud<PointXyz>, DecodeError> {
        Self::decode_bytes(&std::fs::read(path)?, Self::read_xyz)
    }

    pub fn load_xyzrgb(path: &Path) -> Result<PointCloud<PointXyzRgb>, DecodeError> {
        Self::decode_bytes(&std::fs::read(path)?, Self::read_xyzrgb)
    }

    pub fn load_xyzsift(path: &Path) -> Result<PointCloud<PointXyzSift>, DecodeError> {
        Self::decode_bytes(&std::fs::read(path)?, Self::read_xyzsift)
    }

    /// Decode an in-memory PCD file as the requested kind
    pub fn decode_slice(bytes: &[u8], kind: PayloadKind) -> Result<Payload, DecodeError> {
        Ok(match kind {
            PayloadKind::Xyz => Self::decode_bytes(bytes, Self::read_xyz)?.into(),
            PayloadKind::XyzRgb => Self::decode_bytes(bytes, Self::read_xyzrgb)?.into(),
            PayloadKind::XyzSift => Self::decode_bytes(bytes, Self::read_xyzsift)?.into(),
        })
    }

    fn decode_bytes<P>(
        bytes: &[u8],
        read: fn(&PointTable<'_>) -> Result<Vec<P>, DecodeError>,
    ) -> Result<PointCloud<P>, DecodeError> {
        let header = PcdHeader::parse(bytes)?;
        let table = PointTable::new(&header, bytes)?;
        let points = read(&table)?;
        Ok(PointCloud {
            width: header.width,
            height: header.height,
            viewpoint: header.viewpoint,
            points,
        })
    }

    fn read_xyz(t: &PointTable<'_>) -> Result<Vec<PointXyz>, DecodeError> {
        let (fx, fy, fz) = xyz_fields(t.header)?;
        (0..t.header.points)
            .map(|i| {
                Ok(PointXyz {
                    x: t.value(i, fx, 0)? as f32,
                    y: t.value(i, fy, 0)? as f32,
                    z: t.value(i, fz, 0)? as f32,
                })
            })
            .collect()
    }

    fn read_xyzrgb(t: &PointTable<'_>) -> Result<Vec<PointXyzRgb>, DecodeError> {
        let (fx, fy, fz) = xyz_fields(t.header)?;
        let frgb = t
            .header
            .field("rgb")
            .or_else(|| t.header.field("rgba"))
            .ok_or(DecodeError::MissingField("rgb"))?;
        (0..t.header.points)
            .map(|i| {
                let mut p = PointXyzRgb {
                    x: t.value(i, fx, 0)? as f32,
                    y: t.value(i, fy, 0)? as f32,
                    z: t.value(i, fz, 0)? as f32,
                    ..Default::default()
                };
                p.set_packed_rgb(t.bits32(i, frgb)?);
                Ok(p)
            })
            .collect()
    }

    fn read_xyzsift(t: &PointTable<'_>) -> Result<Vec<PointXyzSift>, DecodeError> {
        let (fx, fy, fz) = xyz_fields(t.header)?;
        let fdesc = t.header.require("descriptor")?;
        let fmult = t.header.field("multiplicity");
        let fid = t.header.field("pointId");
        let desc_len = fdesc.count.min(SIFT_DESCRIPTOR_LEN);
        (0..t.header.points)
            .map(|i| {
                let mut p = PointXyzSift {
                    x: t.value(i, fx, 0)? as f32,
                    y: t.value(i, fy, 0)? as f32,
                    z: t.value(i, fz, 0)? as f32,
                    ..Default::default()
                };
                if let Some(f) = fmult {
                    p.multiplicity = t.value(i, f, 0)? as i32;
                }
                if let Some(f) = fid {
                    p.point_id = t.value(i, f, 0)? as i32;
                }
                for (k, slot) in p.descriptor.iter_mut().take(desc_len).enumerate() {
                    *slot = t.value(i, fdesc, k)? as f32;
                }
                Ok(p)
            })
            .collect()
    }
}

fn xyz_fields(header: &PcdHeader) -> Result<(&PcdField, &PcdField, &PcdField), DecodeError> {
    Ok((header.require("x")?, header.require("y")?, header.require("z")?))
}

impl PayloadDecoder for PcdLoader {
    fn decode(&self, file: &Path, kind: PayloadKind) -> Result<Payload, DecodeError> {
        debug!("Decoding {} from {}", kind, file.display());
        let bytes = std::fs::read(file)?;
        Self::decode_slice(&bytes, kind)
    }
}
