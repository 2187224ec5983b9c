//! Quota, metadata, listing and file management.

use pcs_protocol::constants::PARAM_JSON;
use pcs_protocol::operation::{
    BATCH_META, COPY, DELETE, DIFF, LIST, META, MKDIR, MOVE, QUOTA_INFO, SEARCH,
};
use pcs_protocol::options::{DiffOptions, ListFilesOptions, MoveCopyOptions, SearchOptions};
use pcs_protocol::types::{Ack, DiffResponse, FromTo, ListResponse, MoveCopyResponse};
use pcs_protocol::{FileMeta, FileRecord, Operation, PathOptions, Quota};
use pcs_transfer::validate_remote_path;
use serde::Serialize;

use crate::client::Client;
use crate::error::{Context, Error};

#[derive(Serialize)]
struct PathEntry<'a> {
    path: &'a str,
}

#[derive(Serialize)]
struct BatchParam<T> {
    list: Vec<T>,
}

impl Client {
    /// Storage quota of the current user.
    pub async fn quota(&self) -> Result<Quota, Error> {
        let req = self.bare_request(QUOTA_INFO)?;
        self.json(req).await
    }

    pub async fn mkdir(&self, path: &str) -> Result<FileRecord, Error> {
        let req = self.request(MKDIR, &PathOptions::new(path))?;
        self.json(req).await
    }

    /// Metadata of one file or directory.
    pub async fn meta(&self, path: &str) -> Result<FileMeta, Error> {
        let req = self.request(META, &PathOptions::new(path))?;
        let context = req.context.clone();
        let resp: ListResponse<FileMeta> = self.json(req).await?;
        resp.list.into_iter().next().ok_or_else(|| Error::Decode {
            context,
            source: serde::de::Error::custom("meta response has an empty list"),
        })
    }

    /// Metadata of several paths in one request.
    pub async fn batch_meta(&self, paths: &[&str]) -> Result<Vec<FileMeta>, Error> {
        let context = Context::new(BATCH_META);
        let entries = batch_paths(&context, paths)?;
        let req = self.bare_request(BATCH_META)?;
        let resp: ListResponse<FileMeta> = self
            .json(req.with_form(vec![(PARAM_JSON, encode_param(entries))]))
            .await?;
        Ok(resp.list)
    }

    /// Lists a directory.
    pub async fn list(&self, opts: &ListFilesOptions) -> Result<Vec<FileRecord>, Error> {
        let req = self.request(LIST, opts)?;
        let resp: ListResponse<FileRecord> = self.json(req).await?;
        Ok(resp.list)
    }

    pub async fn move_file(&self, from: &str, to: &str) -> Result<MoveCopyResponse, Error> {
        self.move_or_copy(MOVE, from, to).await
    }

    pub async fn copy_file(&self, from: &str, to: &str) -> Result<MoveCopyResponse, Error> {
        self.move_or_copy(COPY, from, to).await
    }

    async fn move_or_copy(
        &self,
        op: Operation,
        from: &str,
        to: &str,
    ) -> Result<MoveCopyResponse, Error> {
        let opts = MoveCopyOptions {
            from: from.into(),
            to: to.into(),
        };
        let req = self.request(op, &opts)?;
        validate_remote_path(to).map_err(|source| Error::Transfer {
            context: req.context.clone(),
            source,
        })?;
        self.json(req).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        let req = self.request(DELETE, &PathOptions::new(path))?;
        let _: Ack = self.json(req).await?;
        Ok(())
    }

    pub async fn batch_move(&self, pairs: &[FromTo]) -> Result<MoveCopyResponse, Error> {
        self.batch_move_or_copy(MOVE, pairs).await
    }

    pub async fn batch_copy(&self, pairs: &[FromTo]) -> Result<MoveCopyResponse, Error> {
        self.batch_move_or_copy(COPY, pairs).await
    }

    async fn batch_move_or_copy(
        &self,
        op: Operation,
        pairs: &[FromTo],
    ) -> Result<MoveCopyResponse, Error> {
        let context = Context::new(op);
        if pairs.is_empty() {
            return Err(Error::invalid(&context, "batch needs at least one pair"));
        }
        for pair in pairs {
            for path in [&pair.from, &pair.to] {
                check_path(&context, path)?;
            }
        }
        let req = self.bare_request(op)?;
        self.json(req.with_form(vec![(PARAM_JSON, encode_param(pairs.to_vec()))]))
            .await
    }

    pub async fn batch_delete(&self, paths: &[&str]) -> Result<(), Error> {
        let context = Context::new(DELETE);
        let entries = batch_paths(&context, paths)?;
        let req = self.bare_request(DELETE)?;
        let _: Ack = self
            .json(req.with_form(vec![(PARAM_JSON, encode_param(entries))]))
            .await?;
        Ok(())
    }

    /// Searches file names under a directory.
    pub async fn search(&self, opts: &SearchOptions) -> Result<Vec<FileRecord>, Error> {
        let req = self.request(SEARCH, opts)?;
        let resp: ListResponse<FileRecord> = self.json(req).await?;
        Ok(resp.list)
    }

    /// Changes since `cursor`; start with [`DiffOptions::first`].
    pub async fn diff(&self, opts: &DiffOptions) -> Result<DiffResponse, Error> {
        let req = self.request(DIFF, opts)?;
        self.json(req).await
    }
}

fn check_path(context: &Context, path: &str) -> Result<(), Error> {
    validate_remote_path(path).map_err(|source| Error::Transfer {
        context: context.clone().with_target(Some(path)),
        source,
    })
}

fn batch_paths<'a>(context: &Context, paths: &[&'a str]) -> Result<Vec<PathEntry<'a>>, Error> {
    if paths.is_empty() {
        return Err(Error::invalid(context, "batch needs at least one path"));
    }
    paths
        .iter()
        .map(|&path| check_path(context, path).map(|()| PathEntry { path }))
        .collect()
}

/// `{"list":[...]}` as sent in the `param` form field.
pub(crate) fn encode_param<T: Serialize>(list: Vec<T>) -> String {
    // Plain strings and integers always serialize.
    serde_json::to_string(&BatchParam { list }).unwrap_or_default()
}
