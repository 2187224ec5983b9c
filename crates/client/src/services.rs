//! Media, offline download and recycle bin calls.

use bytes::Bytes;
use pcs_protocol::constants::PARAM_JSON;
use pcs_protocol::operation::{
    ADD_TASK, CANCEL_TASK, DELETE, LIST_RECYCLE, LIST_STREAM, LIST_TASK, QUERY_TASK, RESTORE,
    STREAMING, THUMBNAIL,
};
use pcs_protocol::options::{
    AddTaskOptions, CancelTaskOptions, EmptyRecycleOptions, ListRecycleOptions, ListStreamOptions,
    ListTaskOptions, QueryTaskOptions, RestoreOptions, StreamingOptions, ThumbnailOptions,
};
use pcs_protocol::types::{
    Ack, AddTaskResponse, FsId, ListResponse, RestoreResponse, StreamFiles,
};
use pcs_protocol::FileRecord;
use serde_json::Value;
use tracing::info;

use crate::client::Client;
use crate::error::{Context, Error};
use crate::files::encode_param;

impl Client {
    /// Image thumbnail bytes.
    pub async fn thumbnail(&self, opts: &ThumbnailOptions) -> Result<Bytes, Error> {
        let req = self.request(THUMBNAIL, opts)?;
        self.raw(req).await
    }

    /// Playlist for online playback of a video, e.g. kind `M3U8_640_480`.
    pub async fn streaming(&self, path: &str, kind: &str) -> Result<Bytes, Error> {
        let opts = StreamingOptions {
            path: path.into(),
            kind: kind.into(),
        };
        let req = self.request(STREAMING, &opts)?;
        self.raw(req).await
    }

    pub async fn list_stream(&self, opts: &ListStreamOptions) -> Result<StreamFiles, Error> {
        let req = self.request(LIST_STREAM, opts)?;
        self.json(req).await
    }

    /// Queues an offline download of `source_url` into `save_path`.
    pub async fn add_offline_task(&self, opts: &AddTaskOptions) -> Result<u64, Error> {
        let req = self.request(ADD_TASK, opts)?;
        let resp: AddTaskResponse = self.json(req).await?;
        info!(task_id = resp.task_id, source = %opts.source_url, "offline task added");
        Ok(resp.task_id)
    }

    pub async fn query_offline_tasks(&self, opts: &QueryTaskOptions) -> Result<Value, Error> {
        let req = self.request(QUERY_TASK, opts)?;
        self.json(req).await
    }

    pub async fn list_offline_tasks(&self, opts: &ListTaskOptions) -> Result<Value, Error> {
        let req = self.request(LIST_TASK, opts)?;
        self.json(req).await
    }

    pub async fn cancel_offline_task(&self, opts: &CancelTaskOptions) -> Result<Value, Error> {
        let req = self.request(CANCEL_TASK, opts)?;
        self.json(req).await
    }

    pub async fn list_recycle(&self, opts: &ListRecycleOptions) -> Result<Vec<FileRecord>, Error> {
        let req = self.request(LIST_RECYCLE, opts)?;
        let resp: ListResponse<FileRecord> = self.json(req).await?;
        Ok(resp.list)
    }

    pub async fn restore(&self, fs_id: u64) -> Result<RestoreResponse, Error> {
        let req = self.request(RESTORE, &RestoreOptions { fs_id })?;
        self.json(req).await
    }

    pub async fn batch_restore(&self, fs_ids: &[u64]) -> Result<RestoreResponse, Error> {
        if fs_ids.is_empty() {
            return Err(Error::invalid(
                &Context::new(RESTORE),
                "batch needs at least one fs_id",
            ));
        }
        let ids: Vec<FsId> = fs_ids.iter().map(|&fs_id| FsId { fs_id }).collect();
        let req = self.bare_request(RESTORE)?;
        self.json(req.with_form(vec![(PARAM_JSON, encode_param(ids))]))
            .await
    }

    /// Permanently deletes everything in the recycle bin.
    pub async fn empty_recycle(&self) -> Result<(), Error> {
        let req = self.request(DELETE, &EmptyRecycleOptions)?;
        let _: Ack = self.json(req).await?;
        info!("recycle bin emptied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::test_support::{MockResponse, mock_server};
    use pcs_protocol::options::{StreamType, TaskQuery};

    #[tokio::test]
    async fn thumbnail_returns_image_bytes() {
        let server = mock_server(|_| MockResponse::bytes(200, vec![0xFF, 0xD8, 0xFF])).await;
        let client = server.client();

        let opts = ThumbnailOptions {
            path: "/apps/a.jpg".into(),
            quality: Some(80),
            width: 120,
            height: 90,
        };
        let data = client.thumbnail(&opts).await.unwrap();
        assert_eq!(data.as_ref(), &[0xFF, 0xD8, 0xFF]);

        let req = &server.requests()[0];
        assert_eq!(req.path, "/thumbnail");
        assert_eq!(req.api_method(), "generate");
        assert_eq!(req.query_value("width"), Some("120"));
    }

    #[tokio::test]
    async fn streaming_rejects_unknown_kind() {
        let server = mock_server(|_| MockResponse::bytes(200, Vec::new())).await;
        let err = server
            .client()
            .streaming("/apps/v.mp4", "MP4_HD")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(server.request_count(), 0);
    }

    #[tokio::test]
    async fn list_stream_by_kind() {
        let server = mock_server(|_| {
            MockResponse::json(200, r#"{"total":1,"start":0,"limit":10,"list":[{"path":"/apps/v.mp4","size":9}]}"#)
        })
        .await;
        let files = server
            .client()
            .list_stream(&ListStreamOptions::new(StreamType::Video))
            .await
            .unwrap();
        assert_eq!(files.total, 1);
        assert_eq!(files.list[0].size, 9);
        assert_eq!(server.requests()[0].query_value("type"), Some("video"));
    }

    #[tokio::test]
    async fn offline_task_lifecycle() {
        let server = mock_server(|req| match req.api_method() {
            "add_task" => MockResponse::json(200, r#"{"task_id":42,"request_id":1}"#),
            "query_task" => MockResponse::json(200, r#"{"task_info":{"42":{"status":"1"}}}"#),
            _ => MockResponse::json(200, r#"{"request_id":2}"#),
        })
        .await;
        let client = server.client();

        let task_id = client
            .add_offline_task(&AddTaskOptions {
                save_path: "/apps/dl/file.iso".into(),
                source_url: "http://mirror.example.com/file.iso".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(task_id, 42);

        let info = client
            .query_offline_tasks(&QueryTaskOptions {
                task_ids: vec![task_id],
                op_type: TaskQuery::Progress,
                expires: None,
            })
            .await
            .unwrap();
        assert_eq!(info["task_info"]["42"]["status"], "1");

        client
            .cancel_offline_task(&CancelTaskOptions {
                task_id,
                expires: None,
            })
            .await
            .unwrap();

        let reqs = server.requests();
        assert_eq!(reqs.len(), 3);
        assert!(reqs.iter().all(|r| r.path == "/services/cloud_dl"));
        assert_eq!(reqs[1].query_value("task_ids"), Some("42"));
        assert_eq!(reqs[2].query_value("task_id"), Some("42"));
    }

    #[tokio::test]
    async fn batch_restore_sends_fs_ids() {
        let server = mock_server(|_| {
            MockResponse::json(200, r#"{"extra":{"list":[{"fs_id":"7"},{"fs_id":8}]}}"#)
        })
        .await;
        let client = server.client();

        let resp = client.batch_restore(&[7, 8]).await.unwrap();
        assert_eq!(resp.extra.list.len(), 2);
        assert_eq!(
            server.requests()[0].form_value("param").unwrap(),
            r#"{"list":[{"fs_id":7},{"fs_id":8}]}"#
        );

        assert!(client.batch_restore(&[]).await.is_err());
        assert_eq!(server.request_count(), 1);
    }

    #[tokio::test]
    async fn empty_recycle_uses_delete_with_type() {
        let server = mock_server(|_| MockResponse::json(200, r#"{"request_id":5}"#)).await;
        server.client().empty_recycle().await.unwrap();

        let req = &server.requests()[0];
        assert_eq!(req.method, "POST");
        assert_eq!(req.api_method(), "delete");
        assert_eq!(req.query_value("type"), Some("recycle"));
    }
}
