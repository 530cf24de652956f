//! Labeled board datasets.
//!
//! The on-disk form is a headerless comma-separated table: nine cell columns
//! (`x`, `o`, `b`) followed by one label column. Labels may use either the
//! English spelling (`near end`) or the published dataset spelling
//! (`Possibilidade de Fim de Jogo`); see [`GameState`]'s `FromStr`.

use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use tictac_engine::{Board, GameState, InvalidBoardError};

/// Number of comma-separated fields on every dataset line.
pub const COLUMN_COUNT: usize = Board::CELL_COUNT + 1;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum LoadDatasetError {
    #[display("failed to read dataset {}", path.display())]
    Io {
        path: PathBuf,
        #[error(source)]
        source: io::Error,
    },
    #[display("line {line}: expected {COLUMN_COUNT} columns, found {found}")]
    ColumnCount { line: usize, found: usize },
    #[display("line {line}: {source}")]
    InvalidBoard {
        line: usize,
        #[error(source)]
        source: InvalidBoardError,
    },
    #[display("line {line}: unknown label '{label}'")]
    UnknownLabel { line: usize, label: String },
    #[display("dataset contains no rows")]
    Empty,
}

/// A board paired with its ground-truth label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatasetRow {
    pub board: Board,
    pub label: GameState,
}

/// An immutable, in-memory table of labeled boards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    rows: Vec<DatasetRow>,
}

impl Dataset {
    /// Wraps rows as a dataset, rejecting an empty table.
    pub fn new(rows: Vec<DatasetRow>) -> Result<Self, LoadDatasetError> {
        if rows.is_empty() {
            return Err(LoadDatasetError::Empty);
        }
        Ok(Self { rows })
    }

    /// Labels each board with `labeler`.
    pub fn from_boards<I, F>(boards: I, mut labeler: F) -> Result<Self, LoadDatasetError>
    where
        I: IntoIterator<Item = Board>,
        F: FnMut(&Board) -> GameState,
    {
        let rows = boards
            .into_iter()
            .map(|board| DatasetRow {
                label: labeler(&board),
                board,
            })
            .collect();
        Self::new(rows)
    }

    pub fn open<P>(path: P, skip_header: bool) -> Result<Self, LoadDatasetError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let io_err = |source| LoadDatasetError::Io {
            path: path.to_owned(),
            source,
        };
        let file = File::open(path).map_err(io_err)?;
        let dataset = Self::read(BufReader::new(file), skip_header).map_err(|e| match e {
            LoadDatasetError::Io { source, .. } => io_err(source),
            e => e,
        })?;
        tracing::info!(
            path = %path.display(),
            rows = dataset.len(),
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Parses a dataset from any buffered reader.
    ///
    /// Blank lines are skipped; line numbers in errors are 1-based and count
    /// every physical line, header included.
    pub fn read<R>(reader: R, skip_header: bool) -> Result<Self, LoadDatasetError>
    where
        R: BufRead,
    {
        let mut rows = vec![];
        for (i, line) in reader.lines().enumerate() {
            let line_no = i + 1;
            let line = line.map_err(|source| LoadDatasetError::Io {
                path: PathBuf::new(),
                source,
            })?;
            if (skip_header && i == 0) || line.trim().is_empty() {
                continue;
            }
            rows.push(parse_row(line_no, &line)?);
        }
        Self::new(rows)
    }

    pub fn write_csv<W>(&self, writer: W) -> io::Result<()>
    where
        W: Write,
    {
        let mut writer = BufWriter::new(writer);
        for row in &self.rows {
            for cell in row.board.cells() {
                write!(writer, "{cell},")?;
            }
            writeln!(writer, "{}", row.label)?;
        }
        writer.flush()
    }

    #[must_use]
    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn boards(&self) -> impl Iterator<Item = &Board> {
        self.rows.iter().map(|r| &r.board)
    }

    pub fn labels(&self) -> impl Iterator<Item = GameState> + '_ {
        self.rows.iter().map(|r| r.label)
    }

    /// Rows at `indices`, in the order given.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Vec<DatasetRow> {
        indices.iter().map(|&i| self.rows[i]).collect()
    }
}

fn parse_row(line_no: usize, line: &str) -> Result<DatasetRow, LoadDatasetError> {
    let fields = line.split(',').map(str::trim).collect::<Vec<_>>();
    if fields.len() != COLUMN_COUNT {
        return Err(LoadDatasetError::ColumnCount {
            line: line_no,
            found: fields.len(),
        });
    }
    let (cells, label) = fields.split_at(Board::CELL_COUNT);
    let board = Board::from_tokens(cells).map_err(|source| LoadDatasetError::InvalidBoard {
        line: line_no,
        source,
    })?;
    let label = label[0]
        .parse::<GameState>()
        .map_err(|e| LoadDatasetError::UnknownLabel {
            line: line_no,
            label: e.label,
        })?;
    Ok(DatasetRow { board, label })
}
