use makkah_api_models::PackageCategory;
use makkah_client::Catalog;
use makkah_session::Route;

use crate::cli::{CategoryArg, IdArgs, PackageListArgs, ShopArgs};
use crate::client::{AppContext, CliResult, api_failure};
use crate::output::{render_blog, render_list, render_package, render_shop};

const fn category(arg: CategoryArg) -> (PackageCategory, Route) {
    match arg {
        CategoryArg::Hajj => (PackageCategory::Hajj, Route::Hajj),
        CategoryArg::Umrah => (PackageCategory::Umrah, Route::Home),
    }
}

pub(crate) async fn handle_packages(ctx: &AppContext, args: PackageListArgs) -> CliResult<()> {
    let (category, route) = category(args.category);
    let packages = Catalog::new(ctx.api(&route))
        .packages(category)
        .await
        .map_err(|err| api_failure(err, None))?;
    render_list(&packages, ctx.output)
}

pub(crate) async fn handle_package(ctx: &AppContext, args: IdArgs) -> CliResult<()> {
    let route = Route::HajjPackage { id: args.id.clone() };
    let package = Catalog::new(ctx.api(&route))
        .package(&args.id)
        .await
        .map_err(|err| api_failure(err, None))?;
    render_package(&package, ctx.output)
}

pub(crate) async fn handle_blogs(ctx: &AppContext) -> CliResult<()> {
    let blogs = Catalog::new(ctx.api(&Route::Blog))
        .blogs()
        .await
        .map_err(|err| api_failure(err, None))?;
    render_list(&blogs, ctx.output)
}

pub(crate) async fn handle_blog(ctx: &AppContext, args: IdArgs) -> CliResult<()> {
    let route = Route::BlogPost { id: args.id.clone() };
    let blog = Catalog::new(ctx.api(&route))
        .blog(&args.id)
        .await
        .map_err(|err| api_failure(err, None))?;
    render_blog(&blog, ctx.output)
}

pub(crate) async fn handle_reviews(ctx: &AppContext) -> CliResult<()> {
    let reviews = Catalog::new(ctx.api(&Route::Home))
        .reviews()
        .await
        .map_err(|err| api_failure(err, None))?;
    render_list(&reviews, ctx.output)
}

pub(crate) async fn handle_events(ctx: &AppContext) -> CliResult<()> {
    let events = Catalog::new(ctx.api(&Route::Home))
        .events()
        .await
        .map_err(|err| api_failure(err, None))?;
    render_list(&events, ctx.output)
}

pub(crate) async fn handle_shop(ctx: &AppContext, args: ShopArgs) -> CliResult<()> {
    let shop = Catalog::new(ctx.api(&Route::Shop))
        .shop()
        .await
        .map_err(|err| api_failure(err, None))?;
    render_shop(&shop, &args.category, ctx.output)
}
