//! Native GeoTIFF I/O on top of the `tiff` crate
//!
//! Composites are written as one image with one `f64` sample per band,
//! stored band-sequentially (planar), so GDAL-based readers see a single
//! multi-band raster. Band names go into the GDAL metadata tag.

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;

use ndarray::s;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{TiffEncoder, TiffKind, TiffKindBig, TiffKindStandard};
use tiff::tags::{CompressionMethod, PhotometricInterpretation, PlanarConfiguration, SampleFormat, Tag};

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_METADATA: u16 = 42112;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

/// Target size of one strip
const STRIP_BYTES: usize = 1 << 20;
/// Above this payload the file is written as BigTIFF
const BIGTIFF_THRESHOLD: u64 = u32::MAX as u64 - (64 << 20);

/// One decoded band of a GeoTIFF
#[derive(Debug, Clone)]
pub struct NamedPage {
    /// Band name, if the writer stored one
    pub name: Option<String>,
    pub raster: Raster<f64>,
}

/// Read one page (default: the first) of a single-band GeoTIFF file
pub fn read_geotiff<T, P>(path: P, page: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = BufReader::new(File::open(path.as_ref())?);
    decode_page(file, page.unwrap_or(0))
}

/// Read one page of a single-band GeoTIFF held in memory
pub fn read_geotiff_from_buffer<T: RasterElement>(data: &[u8], page: Option<usize>) -> Result<Raster<T>> {
    decode_page(Cursor::new(data), page.unwrap_or(0))
}

/// Read every band of a GeoTIFF file as `f64`, in band order.
///
/// Handles both one multi-sample image and a sequence of single-band
/// pages.
pub fn read_multiband_geotiff<P: AsRef<Path>>(path: P) -> Result<Vec<NamedPage>> {
    let data = std::fs::read(path.as_ref())?;
    read_multiband_geotiff_from_buffer(&data)
}

/// Same as [`read_multiband_geotiff`] but from memory
pub fn read_multiband_geotiff_from_buffer(data: &[u8]) -> Result<Vec<NamedPage>> {
    let mut decoder = Decoder::new(Cursor::new(data))?;
    let samples: u16 = decoder.find_tag_unsigned(Tag::SamplesPerPixel)?.unwrap_or(1);
    if samples > 1 {
        return read_planar_bands(&mut decoder, data, usize::from(samples));
    }

    let mut pages = Vec::new();
    loop {
        let name = band_names(&mut decoder, 1)
            .pop()
            .flatten()
            .or_else(|| decoder.get_tag_ascii_string(Tag::ImageDescription).ok());
        let raster: Raster<f64> = decode_current(&mut decoder)?;
        pages.push(NamedPage { name, raster });

        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }
    Ok(pages)
}

fn decode_page<T, R>(reader: R, page: usize) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader)?;
    for skipped in 0..page {
        if !decoder.more_images() {
            return Err(Error::InvalidParameter {
                name: "page",
                value: page.to_string(),
                reason: format!("file has only {} page(s)", skipped + 1),
            });
        }
        decoder.next_image()?;
    }
    decode_current(&mut decoder)
}

fn decode_current<T, R>(decoder: &mut Decoder<R>) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let (width, height) = decoder.dimensions()?;
    let (rows, cols) = (height as usize, width as usize);

    let data: Vec<T> = match decoder.read_image()? {
        DecodingResult::U8(buf) => cast_all(&buf),
        DecodingResult::U16(buf) => cast_all(&buf),
        DecodingResult::U32(buf) => cast_all(&buf),
        DecodingResult::U64(buf) => cast_all(&buf),
        DecodingResult::I8(buf) => cast_all(&buf),
        DecodingResult::I16(buf) => cast_all(&buf),
        DecodingResult::I32(buf) => cast_all(&buf),
        DecodingResult::I64(buf) => cast_all(&buf),
        DecodingResult::F32(buf) => cast_all(&buf),
        DecodingResult::F64(buf) => cast_all(&buf),
        #[allow(unreachable_patterns)]
        _ => return Err(Error::UnsupportedDataType("unsupported TIFF sample format".into())),
    };

    // Chunky multi-sample pages are not bands of one grid; refuse them.
    if data.len() != rows * cols {
        return Err(Error::UnsupportedDataType(format!(
            "expected one sample per pixel ({} values), got {}",
            rows * cols,
            data.len()
        )));
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;
    if let Some(transform) = read_geotransform(decoder) {
        raster.set_transform(transform);
    }
    raster.set_crs(read_crs(decoder));
    raster.set_nodata(read_nodata(decoder));
    Ok(raster)
}

/// Band-sequential, uncompressed `f64` images, the layout the writer
/// produces. The `tiff` decoder only expands single-sample gray images, so
/// the strips are sliced out of `data` directly.
fn read_planar_bands<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    data: &[u8],
    samples: usize,
) -> Result<Vec<NamedPage>> {
    let unsupported = |what: &str| Error::UnsupportedDataType(format!("multi-band TIFF: {what}"));

    let compression: u16 = decoder.find_tag_unsigned(Tag::Compression)?.unwrap_or(1);
    let planar: u16 = decoder.find_tag_unsigned(Tag::PlanarConfiguration)?.unwrap_or(1);
    let bits: Vec<u16> = decoder.find_tag_unsigned_vec(Tag::BitsPerSample)?.unwrap_or_default();
    let formats: Vec<u16> = decoder.find_tag_unsigned_vec(Tag::SampleFormat)?.unwrap_or_default();
    if compression != CompressionMethod::None.to_u16() {
        return Err(unsupported("compressed strips"));
    }
    if planar != PlanarConfiguration::Planar.to_u16() {
        return Err(unsupported("pixel-interleaved samples"));
    }
    if bits.is_empty()
        || formats.is_empty()
        || bits.iter().any(|&b| b != 64)
        || formats.iter().any(|&f| f != SampleFormat::IEEEFP.to_u16())
    {
        return Err(unsupported("only 64-bit float samples are supported"));
    }

    let (width, height) = decoder.dimensions()?;
    let (rows, cols) = (height as usize, width as usize);
    let rows_per_strip = decoder
        .find_tag_unsigned::<u32>(Tag::RowsPerStrip)?
        .map_or(rows, |r| r as usize)
        .clamp(1, rows.max(1));
    let offsets = decoder.get_tag_u64_vec(Tag::StripOffsets)?;
    let counts = decoder.get_tag_u64_vec(Tag::StripByteCounts)?;
    let strips_per_band = rows.div_ceil(rows_per_strip);
    if offsets.len() != samples * strips_per_band || counts.len() != offsets.len() {
        return Err(unsupported("strip table does not match the band count"));
    }

    let little_endian = data.starts_with(b"II");
    let transform = read_geotransform(decoder);
    let crs = read_crs(decoder);
    let nodata: Option<f64> = read_nodata(decoder);
    let names = band_names(decoder, samples);

    let mut pages = Vec::with_capacity(samples);
    for (band, name) in names.into_iter().enumerate() {
        let mut values = Vec::with_capacity(rows * cols);
        for strip in band * strips_per_band..(band + 1) * strips_per_band {
            let start = usize::try_from(offsets[strip]).map_err(|_| unsupported("strip offset"))?;
            let len = usize::try_from(counts[strip]).map_err(|_| unsupported("strip size"))?;
            let bytes = start
                .checked_add(len)
                .and_then(|end| data.get(start..end))
                .ok_or_else(|| unsupported("strip extends past the end of the file"))?;
            values.extend(bytes.chunks_exact(8).map(|chunk| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                if little_endian {
                    f64::from_le_bytes(raw)
                } else {
                    f64::from_be_bytes(raw)
                }
            }));
        }
        if values.len() != rows * cols {
            return Err(unsupported("band holds the wrong number of samples"));
        }

        let mut raster = Raster::from_vec(values, rows, cols)?;
        if let Some(transform) = transform {
            raster.set_transform(transform);
        }
        raster.set_crs(crs.clone());
        raster.set_nodata(nodata);
        pages.push(NamedPage { name, raster });
    }
    Ok(pages)
}

fn cast_all<S: num_traits::NumCast + Copy, T: RasterElement>(buf: &[S]) -> Vec<T> {
    buf.iter()
        .map(|&v| num_traits::cast(v).unwrap_or_else(T::default_nodata))
        .collect()
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE)).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TIEPOINT)).ok()?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }
    // tiepoint = [I, J, K, X, Y, Z], scale = [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u16_vec(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY)).ok()?;
    // Header is 4 shorts, then 4 shorts per key: id, location, count, value.
    keys.get(4..)?
        .chunks_exact(4)
        .find_map(|entry| match entry {
            [GEOGRAPHIC_TYPE_KEY | PROJECTED_CS_TYPE_KEY, 0, 1, code] => {
                Some(CRS::from_epsg(u32::from(*code)))
            }
            _ => None,
        })
}

fn read_nodata<T: RasterElement, R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<T> {
    let text = decoder.get_tag_ascii_string(Tag::from_u16_exhaustive(GDAL_NODATA)).ok()?;
    let value: f64 = text.trim_matches(char::from(0)).trim().parse().ok()?;
    num_traits::cast(value)
}

/// Band names from the GDAL metadata tag, one slot per sample
fn band_names<R: Read + Seek>(decoder: &mut Decoder<R>, samples: usize) -> Vec<Option<String>> {
    match decoder.get_tag_ascii_string(Tag::from_u16_exhaustive(GDAL_METADATA)) {
        Ok(xml) => parse_band_names(xml.trim_matches(char::from(0)), samples),
        Err(_) => vec![None; samples],
    }
}

fn parse_band_names(xml: &str, samples: usize) -> Vec<Option<String>> {
    let mut names = vec![None; samples];
    let mut reader = Reader::from_str(xml);
    let mut current: Option<usize> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(item)) if item.name().as_ref() == b"Item" => {
                current = description_sample(&item);
            }
            Ok(Event::Text(text)) => {
                if let (Some(slot), Ok(value)) = (current.and_then(|i| names.get_mut(i)), text.unescape()) {
                    *slot = Some(value.into_owned());
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
    names
}

/// Sample index of a `role="description"` metadata item
fn description_sample(item: &BytesStart<'_>) -> Option<usize> {
    let mut is_description = false;
    let mut sample = None;
    for attr in item.attributes().flatten() {
        let value = attr.unescape_value().ok()?;
        match attr.key.as_ref() {
            b"role" => is_description = value == "description",
            b"sample" => sample = value.parse().ok(),
            _ => {}
        }
    }
    sample.filter(|_| is_description)
}

fn xml_error(e: impl std::fmt::Display) -> Error {
    Error::Metadata(e.to_string())
}

/// `<GDALMetadata>` document carrying one description item per named band
fn band_metadata_xml(names: &[Option<&str>]) -> Result<Option<String>> {
    if names.iter().all(Option::is_none) {
        return Ok(None);
    }
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Start(BytesStart::new("GDALMetadata")))
        .map_err(xml_error)?;
    for (sample, name) in names.iter().enumerate() {
        let Some(name) = name else { continue };
        let sample = sample.to_string();
        writer
            .create_element("Item")
            .with_attribute(("name", "DESCRIPTION"))
            .with_attribute(("sample", sample.as_str()))
            .with_attribute(("role", "description"))
            .write_text_content(BytesText::new(name))
            .map_err(xml_error)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("GDALMetadata")))
        .map_err(xml_error)?;
    String::from_utf8(writer.into_inner()).map(Some).map_err(xml_error)
}

/// Write a single `f64` raster as a one-band GeoTIFF
pub fn write_geotiff<P: AsRef<Path>>(raster: &Raster<f64>, path: P) -> Result<()> {
    let mut file = BufWriter::new(File::create(path.as_ref())?);
    encode_bands(&[(None, raster)], &mut file)?;
    file.flush()?;
    Ok(())
}

/// Write named bands as one multi-band GeoTIFF, in order
pub fn write_multiband_geotiff<P: AsRef<Path>>(bands: &[(&str, &Raster<f64>)], path: P) -> Result<()> {
    let mut file = BufWriter::new(File::create(path.as_ref())?);
    encode_named(bands, &mut file)?;
    file.flush()?;
    Ok(())
}

/// Same as [`write_multiband_geotiff`] but into memory
pub fn write_multiband_geotiff_to_buffer(bands: &[(&str, &Raster<f64>)]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_named(bands, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_named<W: Write + Seek>(bands: &[(&str, &Raster<f64>)], writer: W) -> Result<()> {
    let bands: Vec<(Option<&str>, &Raster<f64>)> =
        bands.iter().map(|(name, raster)| (Some(*name), *raster)).collect();
    encode_bands(&bands, writer)
}

fn encode_bands<W: Write + Seek>(bands: &[(Option<&str>, &Raster<f64>)], writer: W) -> Result<()> {
    let Some((_, first)) = bands.first() else {
        return Err(Error::Other("nothing to write: no bands".into()));
    };
    let (rows, cols) = first.shape();
    for (_, raster) in bands {
        if raster.shape() != (rows, cols) {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: raster.rows(),
                ac: raster.cols(),
            });
        }
        if raster.transform() != first.transform() {
            return Err(Error::Other("bands of one file must share a geotransform".into()));
        }
    }

    let payload = (bands.len() * rows * cols * 8) as u64;
    if payload > BIGTIFF_THRESHOLD {
        let mut encoder = TiffEncoder::<W, TiffKindBig>::new_big(writer)?;
        write_planar(&mut encoder, first, bands)
    } else {
        let mut encoder = TiffEncoder::<W, TiffKindStandard>::new(writer)?;
        write_planar(&mut encoder, first, bands)
    }
}

fn write_planar<W: Write + Seek, K: TiffKind>(
    encoder: &mut TiffEncoder<W, K>,
    first: &Raster<f64>,
    bands: &[(Option<&str>, &Raster<f64>)],
) -> Result<()> {
    let (rows, cols) = first.shape();
    let samples = u16::try_from(bands.len()).map_err(|_| Error::InvalidParameter {
        name: "bands",
        value: bands.len().to_string(),
        reason: "too many bands for one TIFF image".into(),
    })?;
    let rows_per_strip = (STRIP_BYTES / (cols.max(1) * 8)).clamp(1, rows.max(1));

    let mut dir = encoder.new_directory()?;
    let mut offsets = Vec::new();
    let mut byte_counts = Vec::new();
    for (_, raster) in bands {
        let data = raster.data();
        for start in (0..rows).step_by(rows_per_strip) {
            let end = (start + rows_per_strip).min(rows);
            let strip: Vec<f64> = data.slice(s![start..end, ..]).iter().copied().collect();
            let offset = dir.write_data(&strip[..])?;
            offsets.push(K::convert_offset(offset)?);
            byte_counts.push(K::convert_offset((strip.len() * 8) as u64)?);
        }
    }

    let n = usize::from(samples);
    let planar = if n > 1 {
        PlanarConfiguration::Planar
    } else {
        PlanarConfiguration::Chunky
    };
    dir.write_tag(Tag::ImageWidth, cols as u32)?;
    dir.write_tag(Tag::ImageLength, rows as u32)?;
    dir.write_tag(Tag::BitsPerSample, &vec![64u16; n][..])?;
    dir.write_tag(Tag::Compression, CompressionMethod::None.to_u16())?;
    dir.write_tag(Tag::PhotometricInterpretation, PhotometricInterpretation::BlackIsZero.to_u16())?;
    dir.write_tag(Tag::SamplesPerPixel, samples)?;
    dir.write_tag(Tag::RowsPerStrip, rows_per_strip as u32)?;
    dir.write_tag(Tag::StripOffsets, K::convert_slice(&offsets))?;
    dir.write_tag(Tag::StripByteCounts, K::convert_slice(&byte_counts))?;
    dir.write_tag(Tag::PlanarConfiguration, planar.to_u16())?;
    dir.write_tag(Tag::SampleFormat, &vec![SampleFormat::IEEEFP.to_u16(); n][..])?;
    if n > 1 {
        // Unspecified extra samples: the bands are data, not colour channels.
        dir.write_tag(Tag::ExtraSamples, &vec![0u16; n - 1][..])?;
    }

    let gt = first.transform();
    dir.write_tag(
        Tag::Unknown(MODEL_PIXEL_SCALE),
        &[gt.pixel_width, gt.pixel_height.abs(), 0.0][..],
    )?;
    dir.write_tag(
        Tag::Unknown(MODEL_TIEPOINT),
        &[0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0][..],
    )?;
    dir.write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), &geo_keys(first.crs())[..])?;
    dir.write_tag(Tag::Unknown(GDAL_NODATA), "nan")?;

    let names: Vec<Option<&str>> = bands.iter().map(|(name, _)| *name).collect();
    if let Some(xml) = band_metadata_xml(&names)? {
        dir.write_tag(Tag::Unknown(GDAL_METADATA), xml.as_str())?;
    }
    dir.finish()?;
    Ok(())
}

fn geo_keys(crs: Option<&CRS>) -> Vec<u16> {
    let geographic = crs.map_or(true, |c| c.is_geographic());
    let code = crs
        .and_then(|c| c.epsg())
        .and_then(|c| u16::try_from(c).ok());

    let mut keys: Vec<u16> = vec![
        GT_MODEL_TYPE_KEY, 0, 1, if geographic { 2 } else { 1 },
        GT_RASTER_TYPE_KEY, 0, 1, 1,
    ];
    if let Some(code) = code {
        let key = if geographic { GEOGRAPHIC_TYPE_KEY } else { PROJECTED_CS_TYPE_KEY };
        keys.extend_from_slice(&[key, 0, 1, code]);
    }

    let mut out = vec![1, 1, 0, (keys.len() / 4) as u16];
    out.extend(keys);
    out
}
