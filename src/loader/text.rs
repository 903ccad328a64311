use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use log::debug;

use super::{TensorRole, TensorSink, TensorSource};
use crate::error::{Result, WinogradError};

/// How a tensor text file is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    /// Whitespace-separated floats, nothing else.
    Plain,
    /// `count name rank dim0 .. dimN data_type` followed by the values.
    Header,
}

/// Tensors stored as text files, one file per role.
///
/// Paths ending in `.gz` are decompressed on read.
#[derive(Debug, Clone, Default)]
pub struct TextTensorFiles {
    pub input: Option<PathBuf>,
    pub weight: Option<PathBuf>,
    pub bias: Option<PathBuf>,
    pub output: Option<PathBuf>,
    input_plain: bool,
}

impl TextTensorFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = Some(path.into());
        self
    }

    pub fn with_weight(mut self, path: impl Into<PathBuf>) -> Self {
        self.weight = Some(path.into());
        self
    }

    pub fn with_bias(mut self, path: impl Into<PathBuf>) -> Self {
        self.bias = Some(path.into());
        self
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Read the input file as plain floats instead of the header format.
    pub fn with_plain_input(mut self, plain: bool) -> Self {
        self.input_plain = plain;
        self
    }

    pub fn format(&self, role: TensorRole) -> TextFormat {
        match role {
            TensorRole::Input if !self.input_plain => TextFormat::Header,
            _ => TextFormat::Plain,
        }
    }

    fn path(&self, role: TensorRole) -> Result<&Path> {
        let path = match role {
            TensorRole::Input => &self.input,
            TensorRole::Weight => &self.weight,
            TensorRole::Bias => &self.bias,
            TensorRole::Output => &self.output,
        };
        path.as_deref()
            .ok_or_else(|| WinogradError::InvalidConfig(format!("no file configured for {}", role)))
    }
}

fn open_reader(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(reader)
}

fn parse_floats<'a>(tokens: impl Iterator<Item = &'a str>) -> Result<Vec<f32>> {
    tokens
        .map(|tok| {
            tok.parse::<f32>()
                .map_err(|_| WinogradError::Parse(format!("invalid float '{}'", tok)))
        })
        .collect()
}

fn next_token<'a>(tokens: &mut impl Iterator<Item = &'a str>, what: &str) -> Result<&'a str> {
    tokens
        .next()
        .ok_or_else(|| WinogradError::Parse(format!("unexpected end of header, expected {}", what)))
}

fn parse_int(tok: &str, what: &str) -> Result<usize> {
    tok.parse::<usize>()
        .map_err(|_| WinogradError::Parse(format!("invalid {} '{}'", what, tok)))
}

/// Parse tensor text in `format`, checking it holds exactly `expected_len` values.
pub fn parse_tensor_text(text: &str, format: TextFormat, expected_len: usize) -> Result<Vec<f32>> {
    let mut tokens = text.split_whitespace();
    if format == TextFormat::Header {
        let _count = parse_int(next_token(&mut tokens, "blob count")?, "blob count")?;
        let name = next_token(&mut tokens, "blob name")?;
        let rank = parse_int(next_token(&mut tokens, "rank")?, "rank")?;
        let mut dims = Vec::with_capacity(rank);
        for _ in 0..rank {
            dims.push(parse_int(next_token(&mut tokens, "dimension")?, "dimension")?);
        }
        let data_type = parse_int(next_token(&mut tokens, "data type")?, "data type")?;
        if data_type != 0 {
            return Err(WinogradError::Parse(format!("unsupported data type {} for '{}'", data_type, name)));
        }
        let declared: usize = dims.iter().product();
        if declared != expected_len {
            return Err(WinogradError::shape(&format!("blob '{}'", name), expected_len, format!("{:?}", dims)));
        }
        debug!("blob '{}' dims {:?}", name, dims);
    }

    let values = parse_floats(tokens)?;
    if values.len() != expected_len {
        return Err(WinogradError::shape("tensor file values", expected_len, values.len()));
    }
    Ok(values)
}

impl TensorSource for TextTensorFiles {
    fn load_tensor(&mut self, role: TensorRole, expected_len: usize) -> Result<Vec<f32>> {
        let path = self.path(role)?;
        let mut text = String::new();
        open_reader(path)?.read_to_string(&mut text)?;
        debug!("loading {} from {}", role, path.display());
        parse_tensor_text(&text, self.format(role), expected_len)
    }
}

impl TensorSink for TextTensorFiles {
    fn write_tensor(&mut self, role: TensorRole, data: &[f32]) -> Result<()> {
        let path = self.path(role)?;
        let mut writer = BufWriter::new(File::create(path)?);
        for val in data {
            writeln!(writer, "{}", val)?;
        }
        writer.flush()?;
        debug!("wrote {} values of {} to {}", data.len(), role, path.display());
        Ok(())
    }
}
