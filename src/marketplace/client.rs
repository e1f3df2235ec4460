use std::path::Path;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, ACCEPT, CONTENT_LENGTH, USER_AGENT},
    Body, Client, ClientBuilder, Response, StatusCode,
};
use tokio::{fs::File, io::AsyncWriteExt};
use tokio_util::io::ReaderStream;
use url::Url;

use super::{
    DownloadLinkPayload, DownloadRequestPayload, MarketplaceError, Product, ProductListPayload,
    ProductPayload, ProductStore, ResponseEnvelope, UploadUrlPayload, UploadUrlRequest,
    UploadedFile, Uploader,
};

const PAGE_SIZE: u32 = 20;

pub struct MarketplaceClient {
    client: Client,
    host: String,
}

impl MarketplaceClient {
    pub fn new(host: impl Into<String>, token: impl AsRef<str>) -> anyhow::Result<Self> {
        let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        log::debug!("{}: {}", USER_AGENT.as_str(), user_agent);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, "application/json".try_into()?);
        headers.insert(
            HeaderName::from_static("csp-auth-token"),
            token.as_ref().try_into()?,
        );
        headers.insert(USER_AGENT, user_agent.try_into()?);

        let client = ClientBuilder::new().default_headers(headers).build()?;
        Ok(Self {
            client,
            host: host.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("https://{}/api/v1/{}", self.host, path)
    }

    fn products_url(&self, search: Option<&str>, page: u32) -> Result<Url, MarketplaceError> {
        let base = self.url("products");
        let mut url = Url::parse(&base).map_err(|source| MarketplaceError::Transport {
            product: String::new(),
            source: source.into(),
        })?;
        let pagination = format!("{{\"page\":{},\"pageSize\":{}}}", page, PAGE_SIZE);
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("managed", "false")
                .append_pair("pagination", &pagination);
            if let Some(search) = search {
                query.append_pair("search", search);
            }
        }
        Ok(url)
    }

    async fn read_body(
        response: reqwest::Response,
        product: &str,
    ) -> Result<(StatusCode, String), MarketplaceError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| MarketplaceError::Transport {
                product: product.to_string(),
                source: source.into(),
            })?;
        Ok((status, body))
    }
}

/// Maps the reply of a product update onto the updated product or the
/// matching error.
pub fn interpret_update_response(
    product: &str,
    status: StatusCode,
    body: &str,
) -> Result<Product, MarketplaceError> {
    if status == StatusCode::FORBIDDEN {
        return Err(MarketplaceError::PermissionDenied {
            product: product.to_string(),
        });
    } else if status != StatusCode::OK {
        return Err(MarketplaceError::UpdateFailed {
            product: product.to_string(),
            status: status.as_u16(),
            body: body.to_string(),
        });
    }

    let envelope: ResponseEnvelope<ProductPayload> =
        serde_json::from_str(body).map_err(|source| MarketplaceError::ResponseParse {
            product: product.to_string(),
            source,
        })?;
    Ok(envelope.response.data)
}

#[async_trait]
impl ProductStore for MarketplaceClient {
    async fn get_product(&self, slug: &str) -> Result<Product, MarketplaceError> {
        let url = self.url(&format!("products/{slug}?increaseViewCount=false&isSlug=true"));
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| MarketplaceError::Transport {
                product: slug.to_string(),
                source: source.into(),
            })?;
        let (status, body) = Self::read_body(response, slug).await?;

        if status == StatusCode::NOT_FOUND {
            return Err(MarketplaceError::ProductNotFound {
                slug: slug.to_string(),
            });
        } else if !status.is_success() {
            return Err(MarketplaceError::UnexpectedResponse {
                url,
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ResponseEnvelope<ProductPayload> =
            serde_json::from_str(&body).map_err(|source| MarketplaceError::ResponseParse {
                product: slug.to_string(),
                source,
            })?;
        Ok(envelope.response.data)
    }

    async fn list_products(
        &self,
        search: Option<String>,
        page: u32,
    ) -> Result<Vec<Product>, MarketplaceError> {
        let url = self.products_url(search.as_deref(), page)?;
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| MarketplaceError::Transport {
                product: String::new(),
                source: source.into(),
            })?;
        let (status, body) = Self::read_body(response, "").await?;

        if !status.is_success() {
            return Err(MarketplaceError::UnexpectedResponse {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ResponseEnvelope<ProductListPayload> = serde_json::from_str(&body)
            .map_err(|source| MarketplaceError::ResponseParse {
                product: String::new(),
                source,
            })?;
        log::debug!(
            "Page {} of {} products",
            page,
            envelope.response.params.total_count
        );
        Ok(envelope.response.products)
    }

    async fn replace_product(
        &self,
        product: &Product,
        is_version_update: bool,
    ) -> Result<Product, MarketplaceError> {
        let url = self.url(&format!(
            "products/{id}/?archivepreviousversion=false&isversionupdate={is_version_update}",
            id = product.id,
        ));
        log::info!("Updating product {}", product.slug);
        log::debug!("PUT {}", url);

        let response = self
            .client
            .put(&url)
            .json(product)
            .send()
            .await
            .map_err(|source| MarketplaceError::Transport {
                product: product.slug.clone(),
                source: source.into(),
            })?;
        let (status, body) = Self::read_body(response, &product.slug).await?;

        interpret_update_response(&product.slug, status, &body)
    }

    async fn download(
        &self,
        product: &Product,
        payload: &DownloadRequestPayload,
        destination: &Path,
    ) -> Result<(), MarketplaceError> {
        let url = self.url(&format!("products/{}/download", product.id));
        log::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|source| MarketplaceError::Transport {
                product: product.slug.clone(),
                source: source.into(),
            })?;
        let (status, body) = Self::read_body(response, &product.slug).await?;

        if !status.is_success() {
            return Err(MarketplaceError::UnexpectedResponse {
                url,
                status: status.as_u16(),
                body,
            });
        }

        let link: ResponseEnvelope<DownloadLinkPayload> =
            serde_json::from_str(&body).map_err(|source| MarketplaceError::ResponseParse {
                product: product.slug.clone(),
                source,
            })?;
        let link = link.response.presigned_url;

        log::info!("Downloading to {}", destination.display());
        let response = self
            .client
            .get(&link)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| MarketplaceError::DownloadFailed {
                url: link.clone(),
                source: source.into(),
            })?;

        let written = save_to_file(response, &link, destination).await?;
        log::debug!("Wrote {} bytes", written);
        Ok(())
    }
}

#[async_trait]
impl Uploader for MarketplaceClient {
    async fn upload_file(&self, path: &Path) -> Result<UploadedFile, MarketplaceError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let upload_failed = |source: reqwest::Error| MarketplaceError::UploadFailed {
            path: path.to_path_buf(),
            source: source.into(),
        };

        let file = File::open(path)
            .await
            .map_err(|source| MarketplaceError::io(path, source))?;
        let size = file
            .metadata()
            .await
            .map_err(|source| MarketplaceError::io(path, source))?
            .len();

        let url = self.url("files/presigned-upload-url");
        log::debug!("POST {}", url);
        let target: ResponseEnvelope<UploadUrlPayload> = self
            .client
            .post(&url)
            .json(&UploadUrlRequest {
                file_name: &file_name,
            })
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(upload_failed)?
            .json()
            .await
            .map_err(upload_failed)?;
        let target = target.response;

        log::info!("Uploading {} ({} bytes)", path.display(), size);
        self.client
            .put(&target.presigned_url)
            .header(CONTENT_LENGTH, size)
            .body(Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(upload_failed)?;

        log::debug!("Stored {} as {}", file_name, target.file_name);
        Ok(UploadedFile {
            url: target.file_url,
        })
    }
}

/// Streams a response body into `destination` chunk by chunk, returning the
/// number of bytes written.
pub async fn save_to_file(
    mut response: Response,
    url: &str,
    destination: &Path,
) -> Result<u64, MarketplaceError> {
    let io_error = |source| MarketplaceError::io(destination, source);
    let mut file = File::create(destination).await.map_err(io_error)?;

    let download_failed = |source: reqwest::Error| MarketplaceError::DownloadFailed {
        url: url.to_string(),
        source: source.into(),
    };

    let mut written = 0;
    while let Some(chunk) = response.chunk().await.map_err(download_failed)? {
        file.write_all(&chunk).await.map_err(io_error)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(io_error)?;
    Ok(written)
}
